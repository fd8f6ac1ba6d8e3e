/*!
Database interaction module.

The Postgres database to which this connects is meant to have the following
tables.

```sql
CREATE TABLE teachers (
    email TEXT PRIMARY KEY
);

CREATE TABLE students (
    email     TEXT PRIMARY KEY,
    suspended SMALLINT NOT NULL DEFAULT 0
);

CREATE TABLE teaches (
    teacher TEXT REFERENCES teachers(email) ON DELETE CASCADE,
    student TEXT REFERENCES students(email) ON DELETE CASCADE,
    PRIMARY KEY (teacher, student)
);
```

Connections come from a `deadpool_postgres` pool that is shared by every
request; the pool opens connections lazily, so constructing a `Store`
never touches the network.
*/

use deadpool_postgres::{
    Client, Config, CreatePoolError, ManagerConfig, Pool, PoolConfig,
    PoolError, RecyclingMethod, Runtime,
};
use tokio_postgres::NoTls;

use crate::config::Cfg;

mod teaches;

static SCHEMA: &[(&str, &str, &str)] = &[
    (
        "SELECT FROM information_schema.tables WHERE table_name = 'teachers'",
        "CREATE TABLE teachers (
            email TEXT PRIMARY KEY
        )",
        "DROP TABLE teachers",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'students'",
        "CREATE TABLE students (
            email     TEXT PRIMARY KEY,
            suspended SMALLINT NOT NULL DEFAULT 0   /* 1 once suspended */
        )",
        "DROP TABLE students",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'teaches'",
        "CREATE TABLE teaches (
            teacher TEXT REFERENCES teachers(email) ON DELETE CASCADE,
            student TEXT REFERENCES students(email) ON DELETE CASCADE,
            PRIMARY KEY (teacher, student)
        )",
        "DROP TABLE teaches",
    ),
];

#[derive(Debug, PartialEq)]
pub struct DbError(String);

impl DbError {
    /// Prepend some contextual `annotation` for the error.
    fn annotate(self, annotation: &str) -> Self {
        let s = format!("{}: {}", annotation, &self.0);
        Self(s)
    }

    pub fn display(&self) -> &str { &self.0 }
}

impl From<tokio_postgres::error::Error> for DbError {
    fn from(e: tokio_postgres::error::Error) -> DbError {
        let mut s = format!("Data DB: {}", &e);
        if let Some(dbe) = e.as_db_error() {
            s.push_str(&format!("; {}", dbe));
        }
        DbError(s)
    }
}

impl From<PoolError> for DbError {
    fn from(e: PoolError) -> DbError {
        DbError(format!("Data DB pool: {}", &e))
    }
}

impl From<CreatePoolError> for DbError {
    fn from(e: CreatePoolError) -> DbError {
        DbError(format!("Data DB pool configuration: {}", &e))
    }
}

impl From<String> for DbError {
    fn from(s: String) -> DbError { DbError(s) }
}

pub struct Store {
    pool: Pool,
}

impl Store {
    pub fn new(cfg: &Cfg) -> Result<Self, DbError> {
        log::trace!(
            "Store::new( [ {}@{}:{}/{} ] ) called.",
            &cfg.db_user, &cfg.db_host, &cfg.db_port, &cfg.db_name
        );

        let mut pg = Config::new();
        pg.user = Some(cfg.db_user.clone());
        pg.password = Some(cfg.db_password.clone());
        pg.host = Some(cfg.db_host.clone());
        pg.port = Some(cfg.db_port);
        pg.dbname = Some(cfg.db_name.clone());
        pg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pg.pool = Some(PoolConfig::new(cfg.db_pool_size));

        let pool = pg.create_pool(Some(Runtime::Tokio1), NoTls)?;

        Ok(Self { pool })
    }

    async fn connect(&self) -> Result<Client, DbError> {
        log::trace!("Store::connect() called.");

        match self.pool.get().await {
            Ok(client) => {
                log::trace!("    ...connection acquired.");
                Ok(client)
            },
            Err(e) => {
                let dberr = DbError::from(e);
                log::trace!("    ...connection failed: {:?}", &dberr);
                Err(dberr.annotate("Unable to connect"))
            },
        }
    }

    pub async fn ensure_db_schema(&self) -> Result<(), DbError> {
        log::trace!("Store::ensure_db_schema() called.");

        let mut client = self.connect().await?;
        let t = client.transaction().await
            .map_err(|e| DbError::from(e)
                .annotate("Data DB unable to begin transaction"))?;

        for (test_stmt, create_stmt, _) in SCHEMA.iter() {
            if t.query_opt(*test_stmt, &[]).await?.is_none() {
                log::info!(
                    "{:?} returned no results; attempting to insert table.",
                    test_stmt
                );
                t.execute(*create_stmt, &[]).await?;
            }
        }

        t.commit().await
            .map_err(|e| DbError::from(e)
                .annotate("Error committing transaction"))
    }

    /**
    Drop all database tables to fully reset database state.

    This is only meant for cleanup after testing. It is advisable to look at
    the ERROR level log output when testing to ensure this method did its job.
    */
    #[cfg(test)]
    pub async fn nuke_database(&self) -> Result<(), DbError> {
        log::trace!("Store::nuke_database() called.");

        let client = self.connect().await?;

        for (_, _, drop_stmt) in SCHEMA.iter().rev() {
            if let Err(e) = client.execute(*drop_stmt, &[]).await {
                let err = DbError::from(e);
                log::error!("Error dropping: {:?}: {}", &drop_stmt, &err.display());
            }
        }

        log::trace!("    ....nuking complete.");
        Ok(())
    }
}
