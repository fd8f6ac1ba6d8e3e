/*!
Interoperation between the client and server.

(Not the application and the database; that's covered by `store`.)

Every error response is a JSON object with a single `"message"` member,
whose value is either a human-readable string or, for field-level
validation failures, an object mapping field names to the rule they broke.
*/
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};

use crate::config::Glob;
use crate::store::DbError;

pub mod common;
pub mod notify;
pub mod register;
pub mod suspend;

pub static REQUEST_ID_HEADER: &str = "x-request-id";

pub static MESSAGE_BAD_REQUEST: &str = "The server could not understand the request due to invalid syntax or missing parameters.";
pub static MESSAGE_DATABASE_ERROR: &str = "Failed to query database record. Contact the administrator for more information.";
pub static MESSAGE_MISSING_PARAMS: &str = "Missing one or more required parameter(s)";
pub static INVALID_TEACHER_EMAIL_FORMAT: &str = "Invalid teacher email format";
pub static INVALID_STUDENT_EMAIL_FORMAT: &str = "Invalid student email format";

/// Field-level validation failures: field name to the rule it broke
/// (`required`, `max=N`, `email`).
pub type FieldErrors = BTreeMap<&'static str, String>;

pub fn missing_query_params_message(params: &[&str]) -> String {
    format!(
        "Missing one or more required query parameter(s): {}",
        params.join(", ")
    )
}

pub fn invalid_params_message(fields: &[&str]) -> String {
    format!(
        "One or more field(s) is of the wrong type or format: {}",
        fields.join(", ")
    )
}

pub fn missing_valid_pair_message(first: &str, second: &str) -> String {
    format!("Both fields {} and {} must be present and valid", first, second)
}

/// Check a required string field for presence and length, recording any
/// failure in `errs`. Length is counted in characters.
///
/// Returns the value if it passed.
pub fn require_field<'a>(
    errs: &mut FieldErrors,
    name: &'static str,
    value: &'a Option<String>,
    max_chars: Option<usize>,
) -> Option<&'a str> {
    let value = match value.as_deref() {
        None | Some("") => {
            errs.insert(name, "required".to_owned());
            return None;
        },
        Some(v) => v,
    };

    if let Some(max) = max_chars {
        if value.chars().count() > max {
            errs.insert(name, format!("max={}", max));
            return None;
        }
    }

    Some(value)
}

pub fn respond_message<M: Into<Value>>(code: StatusCode, msg: M) -> Response {
    let msg: Value = msg.into();
    (
        code,
        Json(json!({ "message": msg }))
    ).into_response()
}

pub fn respond_bad_request(msg: String) -> Response {
    log::trace!("respond_bad_request( {:?} ) called.", &msg);

    respond_message(StatusCode::BAD_REQUEST, msg)
}

pub fn respond_field_errors(errs: &FieldErrors) -> Response {
    log::trace!("respond_field_errors( {:?} ) called.", errs);

    let fields: Map<String, Value> = errs.iter()
        .map(|(k, v)| (k.to_string(), Value::from(v.as_str())))
        .collect();
    let mut inner = Map::new();
    inner.insert(MESSAGE_MISSING_PARAMS.to_owned(), Value::Object(fields));

    respond_message(StatusCode::BAD_REQUEST, Value::Object(inner))
}

/// Respond to a request body that couldn't be read as the expected JSON.
pub fn respond_bad_body(rejection: JsonRejection) -> Response {
    log::debug!("Rejecting request body: {}", &rejection);

    respond_message(StatusCode::BAD_REQUEST, MESSAGE_BAD_REQUEST)
}

/**
Log `err` and respond with the generic database error message.

The driver's own error text never makes it into the response.
*/
pub fn respond_db_error(code: StatusCode, err: &DbError) -> Response {
    log::error!("{}", err.display());

    respond_message(code, MESSAGE_DATABASE_ERROR)
}

/// Middleware function to ensure a request's `x-request-id` header, if it
/// has one, is copied onto the response.
pub async fn request_identity<B>(
    req: Request<B>,
    next: Next<B>
) -> Response {
    let id_header = req.headers().get(REQUEST_ID_HEADER).cloned();

    let mut response = next.run(req).await;
    if let Some(id) = id_header {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    response
}

/// All four endpoints, sharing `glob`.
pub fn router(glob: Arc<Glob>) -> Router {
    Router::new()
        .route("/api/commonstudents", get(common::common_students))
        .route("/api/register", post(register::register))
        .route("/api/suspend", post(suspend::suspend))
        .route(
            "/api/retrievefornotifications",
            post(notify::retrieve_for_notifications)
        )
        .layer(Extension(glob))
        .layer(middleware::from_fn(request_identity))
}
