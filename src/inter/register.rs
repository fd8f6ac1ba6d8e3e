/*!
`POST /api/register`

The body may carry a teacher with a list of students to register to them,
a student with a list of teachers to register them to, both, or neither:

```json
{
    "teacher": "teacherken@gmail.com",
    "students": ["studentjon@gmail.com", "studenthon@gmail.com"],
    "student": "studentmay@gmail.com",
    "teachers": ["teacherjoe@gmail.com"]
}
```
*/
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::config::Glob;
use crate::pattern::is_email;
use crate::store::DbError;
use super::*;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub teacher: Option<String>,
    pub students: Option<Vec<String>>,
    pub student: Option<String>,
    pub teachers: Option<Vec<String>>,
}

/// Which end of the teaches relation an identifier sits on.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Role {
    Teacher,
    Student,
}

impl Role {
    fn invalid_email_message(&self) -> &'static str {
        match self {
            Role::Teacher => INVALID_TEACHER_EMAIL_FORMAT,
            Role::Student => INVALID_STUDENT_EMAIL_FORMAT,
        }
    }
}

/// One anchor identifier plus the identifiers to be related to it.
#[derive(Debug)]
struct Pair<'a> {
    anchor_role: Role,
    anchor: &'a str,
    others: &'a [String],
}

impl<'a> Pair<'a> {
    /**
    `Ok(None)` if the pair is wholly absent, `Ok(Some(_))` if it's wholly
    present, and an error naming both fields if only half of it is there.
    */
    fn from_fields(
        anchor_role: Role,
        anchor: &'a Option<String>,
        others: &'a Option<Vec<String>>,
        anchor_field: &str,
        others_field: &str,
    ) -> Result<Option<Pair<'a>>, String> {
        let anchor = anchor.as_deref().filter(|s| !s.is_empty());
        let others = others.as_deref().filter(|v| !v.is_empty());

        match (anchor, others) {
            (None, None) => Ok(None),
            (Some(anchor), Some(others)) => Ok(Some(Pair { anchor_role, anchor, others })),
            _ => Err(missing_valid_pair_message(anchor_field, others_field)),
        }
    }

    fn other_role(&self) -> Role {
        match self.anchor_role {
            Role::Teacher => Role::Student,
            Role::Student => Role::Teacher,
        }
    }

    /// The first email-shape failure, if any, as a response message.
    fn check_emails(&self) -> Result<(), &'static str> {
        if !is_email(self.anchor) {
            return Err(self.anchor_role.invalid_email_message());
        }
        for other in self.others.iter() {
            if !is_email(other) {
                return Err(self.other_role().invalid_email_message());
            }
        }
        Ok(())
    }

    async fn insert(&self, glob: &Glob) -> Result<(), DbError> {
        match self.anchor_role {
            Role::Teacher => glob.store.insert_teacher_with_students(
                self.anchor, self.others
            ).await,
            Role::Student => glob.store.insert_student_with_teachers(
                self.anchor, self.others
            ).await,
        }
    }
}

/**
Register students to a teacher and/or teachers to a student.

Both pairs are checked for completeness before anything is written. After
that each pair is validated and written in turn; a database failure on
the first pair doesn't stop the second from being attempted, but any
failure at all results in a 500, even though some rows may have been
written.
*/
pub async fn register(
    Extension(glob): Extension<Arc<Glob>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => { return respond_bad_body(e); },
    };
    log::trace!("register( {:?} ) called.", &req);

    let to_teacher = match Pair::from_fields(
        Role::Teacher, &req.teacher, &req.students, "teacher", "students"
    ) {
        Ok(p) => p,
        Err(msg) => { return respond_bad_request(msg); },
    };
    let to_student = match Pair::from_fields(
        Role::Student, &req.student, &req.teachers, "student", "teachers"
    ) {
        Ok(p) => p,
        Err(msg) => { return respond_bad_request(msg); },
    };

    if to_teacher.is_none() && to_student.is_none() {
        log::info!("Registration request with nothing to register.");
    }

    let mut db_failed = false;
    for pair in [to_teacher, to_student].iter().flatten() {
        if let Err(msg) = pair.check_emails() {
            return respond_bad_request(msg.to_owned());
        }

        if let Err(e) = pair.insert(&glob).await {
            log::error!(
                "Error registering {:?} {:?} with {} others: {}",
                &pair.anchor_role, pair.anchor, pair.others.len(), e.display()
            );
            db_failed = true;
        }
    }

    if db_failed {
        return respond_message(StatusCode::INTERNAL_SERVER_ERROR, MESSAGE_DATABASE_ERROR);
    }

    StatusCode::NO_CONTENT.into_response()
}
