/*!
`Store` methods for the teacher/student relation: registration,
suspension, and roster retrieval.

None of the multi-statement operations here are wrapped in transactions;
each statement commits on its own. Every insert is `ON CONFLICT DO
NOTHING`, so repeating a registration is harmless.
*/
use std::collections::HashSet;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_postgres::types::{ToSql, Type};

use super::{Store, DbError};

const INSERT_TEACHER: &str =
    "INSERT INTO teachers (email) VALUES ($1) ON CONFLICT DO NOTHING";
const INSERT_STUDENT: &str =
    "INSERT INTO students (email) VALUES ($1) ON CONFLICT DO NOTHING";
const INSERT_TEACHES: &str =
    "INSERT INTO teaches (teacher, student) VALUES ($1, $2) ON CONFLICT DO NOTHING";

impl Store {
    /**
    Ensure `teacher` exists, each of `students` exists (unsuspended if
    new), and `teacher` teaches each of them.

    Statements are issued one at a time; an error partway through leaves
    whatever was inserted before it in place.
    */
    pub async fn insert_teacher_with_students(
        &self,
        teacher: &str,
        students: &[String],
    ) -> Result<(), DbError> {
        log::trace!(
            "Store::insert_teacher_with_students( {:?}, [ {} students ] ) called.",
            teacher, students.len()
        );

        let client = self.connect().await?;
        let insert_teacher = client.prepare_cached(INSERT_TEACHER).await?;
        let insert_student = client.prepare_cached(INSERT_STUDENT).await?;
        let insert_teaches = client.prepare_cached(INSERT_TEACHES).await?;

        client.execute(&insert_teacher, &[&teacher]).await
            .map_err(|e| DbError::from(e)
                .annotate(&format!("Error inserting teacher {:?}", teacher)))?;

        for student in students.iter() {
            client.execute(&insert_student, &[student]).await
                .map_err(|e| DbError::from(e)
                    .annotate(&format!("Error inserting student {:?}", student)))?;
            let n = client.execute(&insert_teaches, &[&teacher, student]).await?;
            if n == 0 {
                log::trace!("{} already teaches {}.", teacher, student);
            }
        }

        Ok(())
    }

    /**
    Ensure `student` exists (unsuspended if new), each of `teachers`
    exists, and each of them teaches `student`.

    Same non-atomic caveat as `insert_teacher_with_students()`.
    */
    pub async fn insert_student_with_teachers(
        &self,
        student: &str,
        teachers: &[String],
    ) -> Result<(), DbError> {
        log::trace!(
            "Store::insert_student_with_teachers( {:?}, [ {} teachers ] ) called.",
            student, teachers.len()
        );

        let client = self.connect().await?;
        let insert_teacher = client.prepare_cached(INSERT_TEACHER).await?;
        let insert_student = client.prepare_cached(INSERT_STUDENT).await?;
        let insert_teaches = client.prepare_cached(INSERT_TEACHES).await?;

        client.execute(&insert_student, &[&student]).await
            .map_err(|e| DbError::from(e)
                .annotate(&format!("Error inserting student {:?}", student)))?;

        for teacher in teachers.iter() {
            client.execute(&insert_teacher, &[teacher]).await
                .map_err(|e| DbError::from(e)
                    .annotate(&format!("Error inserting teacher {:?}", teacher)))?;
            let n = client.execute(&insert_teaches, &[teacher, &student]).await?;
            if n == 0 {
                log::trace!("{} already teaches {}.", teacher, student);
            }
        }

        Ok(())
    }

    /**
    Set the suspended flag on `student`.

    Returns the number of rows touched, which will be zero for an unknown
    student; that isn't treated as an error.
    */
    pub async fn suspend_student(&self, student: &str) -> Result<u64, DbError> {
        log::trace!("Store::suspend_student( {:?} ) called.", student);

        let client = self.connect().await?;
        let n = client.execute(
            "UPDATE students SET suspended = 1 WHERE email = $1",
            &[&student]
        ).await?;

        match n {
            0 => { log::info!("No student {:?} to suspend.", student); },
            1 => { log::trace!("{} suspended.", student); },
            n => {
                log::warn!(
                    "Suspending single student {} affected {} rows.",
                    student, &n
                );
            },
        }

        Ok(n)
    }

    /**
    The full roster of each of `teachers`, suspended students included,
    in the same order as `teachers`.

    The per-teacher queries are pipelined over a single connection.
    */
    pub async fn get_rosters(
        &self,
        teachers: &[String],
    ) -> Result<Vec<HashSet<String>>, DbError> {
        log::trace!("Store::get_rosters( {:?} ) called.", teachers);

        let client = self.connect().await?;
        let stmt = client.prepare_cached(
            "SELECT student FROM teaches WHERE teacher = $1"
        ).await?;

        let pvec: Vec<[&(dyn ToSql + Sync); 1]> = teachers.iter()
            .map(|t| {
                let p: [&(dyn ToSql + Sync); 1] = [t];
                p
            }).collect();

        let mut queries = FuturesUnordered::new();
        for (n, params) in pvec.iter().enumerate() {
            let fut = client.query(&stmt, params);
            queries.push(async move { (n, fut.await) });
        }

        let mut rosters: Vec<HashSet<String>> = vec![HashSet::new(); teachers.len()];
        while let Some((n, res)) = queries.next().await {
            let rows = res.map_err(|e| DbError::from(e)
                .annotate(&format!("Error retrieving roster of {:?}", &teachers[n])))?;
            for row in rows.iter() {
                let student: String = row.try_get("student")?;
                rosters[n].insert(student);
            }
        }

        Ok(rosters)
    }

    /// Unsuspended students taught by `teacher`.
    pub async fn get_reachable_roster(
        &self,
        teacher: &str,
    ) -> Result<Vec<String>, DbError> {
        log::trace!("Store::get_reachable_roster( {:?} ) called.", teacher);

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT teaches.student FROM teaches
                INNER JOIN students ON students.email = teaches.student
                WHERE students.suspended = 0
                AND teaches.teacher = $1",
            &[&teacher]
        ).await?;

        let mut students: Vec<String> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            students.push(row.try_get("student")?);
        }

        Ok(students)
    }

    /// Those of `emails` which name existing, unsuspended students.
    pub async fn filter_reachable_students(
        &self,
        emails: &[&str],
    ) -> Result<Vec<String>, DbError> {
        log::trace!("Store::filter_reachable_students( {:?} ) called.", emails);

        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.connect().await?;
        let stmt = client.prepare_typed_cached(
            "SELECT email FROM students
                WHERE suspended = 0
                AND email = ANY($1)",
            &[Type::TEXT_ARRAY]
        ).await?;
        let rows = client.query(&stmt, &[&emails]).await?;

        let mut students: Vec<String> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            students.push(row.try_get("email")?);
        }

        Ok(students)
    }

    /// Whether `student` is suspended, or `None` if there's no such student.
    pub async fn is_suspended(&self, student: &str) -> Result<Option<bool>, DbError> {
        log::trace!("Store::is_suspended( {:?} ) called.", student);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT suspended FROM students WHERE email = $1",
            &[&student]
        ).await? {
            None => Ok(None),
            Some(row) => {
                let flag: i16 = row.try_get("suspended")?;
                Ok(Some(flag != 0))
            },
        }
    }
}
