/*!
`GET /api/commonstudents?teacher=...&teacher=...`
*/
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::Glob;
use crate::resolve;
use super::*;

/// Students registered to every listed teacher.
pub async fn common_students(
    Extension(glob): Extension<Arc<Glob>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    log::trace!("common_students( {:?} ) called.", &params);

    let teachers: Vec<String> = params.into_iter()
        .filter(|(k, v)| k == "teacher" && !v.is_empty())
        .map(|(_, v)| v)
        .collect();

    if teachers.is_empty() {
        return respond_bad_request(missing_query_params_message(&["teacher"]));
    }

    let rosters = match glob.store.get_rosters(&teachers).await {
        Ok(rosters) => rosters,
        Err(e) => { return respond_db_error(StatusCode::BAD_GATEWAY, &e); },
    };

    let students = resolve::common_students(&rosters);

    (
        StatusCode::OK,
        Json(json!({ "students": students }))
    ).into_response()
}
