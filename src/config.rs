/*!
Structs to hold configuration data and global variables.

Configuration is layered: built-in defaults, then an optional TOML file,
then environment variables (with a `.env` file in the working directory
loaded into the environment first).
*/
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::store::Store;

const DEFAULT_POOL_SIZE: usize = 16;

#[derive(Deserialize)]
struct ConfigFile {
    db_user: Option<String>,
    db_password: Option<String>,
    db_host: Option<String>,
    db_port: Option<u16>,
    db_name: Option<String>,
    db_pool_size: Option<usize>,
    host: Option<String>,
    port: Option<u16>,
}

pub struct Cfg {
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_pool_size: usize,
    pub addr: SocketAddr,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            db_user: "rollcall_test".to_owned(),
            db_password: "rollcall_test".to_owned(),
            db_host: "localhost".to_owned(),
            db_port: 5432,
            db_name: "rollcall_test".to_owned(),
            db_pool_size: DEFAULT_POOL_SIZE,
            addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
        }
    }
}

/// Password is masked.
impl std::fmt::Debug for Cfg {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Cfg")
            .field("db_user", &self.db_user)
            .field("db_password", &"********")
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_name", &self.db_name)
            .field("db_pool_size", &self.db_pool_size)
            .field("addr", &self.addr)
            .finish()
    }
}

fn check_pool_size(n: usize) -> Result<usize, String> {
    if n == 0 {
        Err("Database pool size must be at least 1.".to_owned())
    } else {
        Ok(n)
    }
}

fn parse_host(s: &str) -> Result<std::net::IpAddr, String> {
    s.parse().map_err(|e| format!(
        "Error parsing {:?} as IP address: {}", s, &e
    ))
}

impl Cfg {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        Self::default().overlay_toml(&file_contents)
    }

    fn overlay_toml(mut self, text: &str) -> Result<Self, String> {
        let cf: ConfigFile = toml::from_str(text)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        if let Some(s) = cf.db_user {
            self.db_user = s;
        }
        if let Some(s) = cf.db_password {
            self.db_password = s;
        }
        if let Some(s) = cf.db_host {
            self.db_host = s;
        }
        if let Some(n) = cf.db_port {
            self.db_port = n;
        }
        if let Some(s) = cf.db_name {
            self.db_name = s;
        }
        if let Some(n) = cf.db_pool_size {
            self.db_pool_size = check_pool_size(n)?;
        }
        if let Some(s) = cf.host {
            self.addr.set_ip(parse_host(&s)?);
        }
        if let Some(n) = cf.port {
            self.addr.set_port(n);
        }

        Ok(self)
    }

    /**
    Overwrite any values for which an environment variable is set.

    Recognized variables are `DB_USER`, `DB_PASS`, `DB_HOST`, `DB_PORT`,
    `DB_NAME`, `DB_POOL_SIZE`, `ROUTER_HOST`, and `ROUTER_PORT`.
    */
    pub fn overlay_env(self) -> Result<Self, String> {
        self.overlay_vars(|k| std::env::var(k).ok())
    }

    fn overlay_vars<F>(mut self, get: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>
    {
        if let Some(s) = get("DB_USER") {
            self.db_user = s;
        }
        if let Some(s) = get("DB_PASS") {
            self.db_password = s;
        }
        if let Some(s) = get("DB_HOST") {
            self.db_host = s;
        }
        if let Some(s) = get("DB_PORT") {
            self.db_port = s.parse().map_err(|e| format!(
                "Error parsing DB_PORT value {:?}: {}", &s, &e
            ))?;
        }
        if let Some(s) = get("DB_NAME") {
            self.db_name = s;
        }
        if let Some(s) = get("DB_POOL_SIZE") {
            let n: usize = s.parse().map_err(|e| format!(
                "Error parsing DB_POOL_SIZE value {:?}: {}", &s, &e
            ))?;
            self.db_pool_size = check_pool_size(n)?;
        }
        if let Some(s) = get("ROUTER_HOST") {
            self.addr.set_ip(parse_host(&s)?);
        }
        if let Some(s) = get("ROUTER_PORT") {
            let port: u16 = s.parse().map_err(|e| format!(
                "Error parsing ROUTER_PORT value {:?}: {}", &s, &e
            ))?;
            self.addr.set_port(port);
        }

        Ok(self)
    }
}

/**
This guy gets hauled around in an `axum::Extension` to the handlers who
need him.
*/
pub struct Glob {
    pub store: Store,
    pub addr: SocketAddr,
}

/// Loads system configuration and ensures all appropriate database tables
/// exist.
///
/// `path`, if given, names a TOML file whose values are applied over the
/// defaults before the environment is consulted.
pub async fn load_configuration<P: AsRef<Path>>(path: Option<P>) -> Result<Glob, String> {
    match dotenv::dotenv() {
        Ok(p) => { log::info!("Loaded environment from {}", p.display()); },
        Err(e) => { log::info!("No .env file loaded: {}", &e); },
    }

    let cfg = match path {
        Some(path) => {
            let cfg = Cfg::from_file(path.as_ref())?;
            log::info!("Configuration file {} read.", path.as_ref().display());
            cfg
        },
        None => Cfg::default(),
    };
    let cfg = cfg.overlay_env()?;
    log::info!("Configuration:\n{:#?}", &cfg);

    let store = Store::new(&cfg)
        .map_err(|e| format!("Unable to set up data DB pool: {}", e.display()))?;

    log::trace!("Checking state of data DB...");
    if let Err(e) = store.ensure_db_schema().await {
        let estr = format!("Unable to ensure state of data DB: {}", e.display());
        return Err(estr);
    }
    log::trace!("...data DB okay.");

    Ok(Glob { store, addr: cfg.addr })
}
