/*!
`POST /api/suspend`
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
use super::*;

#[derive(Debug, Deserialize)]
pub struct SuspendRequest {
    pub student: Option<String>,
}

/// Suspend a student. Suspending someone who isn't there is not an error.
pub async fn suspend(
    Extension(glob): Extension<Arc<Glob>>,
    body: Result<Json<SuspendRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => { return respond_bad_body(e); },
    };
    log::trace!("suspend( {:?} ) called.", &req);

    let mut errs = FieldErrors::new();
    let student = match require_field(&mut errs, "student", &req.student, None) {
        Some(s) => s,
        None => { return respond_field_errors(&errs); },
    };

    if let Err(e) = glob.store.suspend_student(student).await {
        return respond_db_error(StatusCode::INTERNAL_SERVER_ERROR, &e);
    }

    StatusCode::NO_CONTENT.into_response()
}
