/*!
`POST /api/retrievefornotifications`

Works out who should receive a notification from a teacher: every
unsuspended student on the teacher's roster, plus every unsuspended
student @-mentioned in the notification text.
*/
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::config::Glob;
use crate::pattern::{extract_mentions, is_email, is_notification};
use crate::resolve;
use super::*;

pub const MAX_TEACHER_CHARS: usize = 60;
pub const MAX_NOTIFICATION_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub teacher: Option<String>,
    pub notification: Option<String>,
}

/// Both fields, validated, or the response explaining why not.
fn validate(req: &NotificationRequest) -> Result<(&str, &str), Response> {
    let mut errs = FieldErrors::new();

    let teacher = require_field(&mut errs, "teacher", &req.teacher, Some(MAX_TEACHER_CHARS));
    if let Some(t) = teacher {
        if !is_email(t) {
            errs.insert("teacher", "email".to_owned());
        }
    }
    let notification = require_field(
        &mut errs, "notification", &req.notification, Some(MAX_NOTIFICATION_CHARS)
    );

    match (teacher, notification) {
        (Some(t), Some(n)) if errs.is_empty() => {
            if is_notification(n) {
                Ok((t, n))
            } else {
                Err(respond_bad_request(invalid_params_message(&["notification"])))
            }
        },
        _ => Err(respond_field_errors(&errs)),
    }
}

pub async fn retrieve_for_notifications(
    Extension(glob): Extension<Arc<Glob>>,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => { return respond_bad_body(e); },
    };
    log::trace!("retrieve_for_notifications( {:?} ) called.", &req);

    let (teacher, notification) = match validate(&req) {
        Ok(x) => x,
        Err(resp) => { return resp; },
    };

    let roster = match glob.store.get_reachable_roster(teacher).await {
        Ok(roster) => roster,
        Err(e) => { return respond_db_error(StatusCode::INTERNAL_SERVER_ERROR, &e); },
    };

    let mentions = extract_mentions(notification);
    let mentions = resolve::distinct_mentions(&mentions);
    let tagged = match glob.store.filter_reachable_students(&mentions).await {
        Ok(tagged) => tagged,
        Err(e) => { return respond_db_error(StatusCode::INTERNAL_SERVER_ERROR, &e); },
    };

    let recipients = resolve::notification_recipients(roster, tagged);
    log::debug!("{} notification recipient(s) for {}.", recipients.len(), teacher);

    (
        StatusCode::OK,
        Json(json!({ "recipient": recipients }))
    ).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inter::router;
    use crate::inter::tests::{message, send, test_app, test_glob, unreachable_app};
    use crate::tests::ensure_logging;

    use axum::{http::Method, Router};
    use serde_json::{Map, Value};
    use serial_test::serial;

    async fn post(app: &Router, body: Value) -> (StatusCode, Option<Value>) {
        send(app, Method::POST, "/api/retrievefornotifications", Some(body)).await
    }

    fn field_errors(fields: Value) -> Value {
        let mut m = Map::new();
        m.insert(MESSAGE_MISSING_PARAMS.to_owned(), fields);
        Value::Object(m)
    }

    #[tokio::test]
    async fn missing_fields() {
        let app = test_app();

        let (status, resp) = post(&app, json!({
            "notification": "hello world @tagged1@gmail.com @tagged2@gmail.com"
        })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&resp), &field_errors(json!({ "teacher": "required" })));

        let (status, resp) = post(&app, json!({ "teacher": "teacher@gmail.com" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&resp), &field_errors(json!({ "notification": "required" })));

        let (status, resp) = post(&app, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            message(&resp),
            &field_errors(json!({ "teacher": "required", "notification": "required" }))
        );
    }

    #[tokio::test]
    async fn oversize_fields() {
        let app = test_app();

        let (status, resp) = post(&app, json!({
            "teacher": "teacherteacherteacherteacherteacherteacherteacherteacherteacher@gmail.com",
            "notification": "hello world @tagged1@gmail.com @tagged2@gmail.com",
        })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&resp), &field_errors(json!({ "teacher": "max=60" })));

        let long_note = format!("{} @tagged1@gmail.com", "helloworld ".repeat(20));
        assert!(long_note.chars().count() > MAX_NOTIFICATION_CHARS);
        let (status, resp) = post(&app, json!({
            "teacher": "teacher@gmail.com",
            "notification": long_note,
        })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&resp), &field_errors(json!({ "notification": "max=200" })));
    }

    #[tokio::test]
    async fn bad_teacher_email() {
        let (status, resp) = post(&test_app(), json!({
            "teacher": "teacher@gmailcom",
            "notification": "hello world @tagged1@gmail.com @tagged2@gmail.com",
        })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&resp), &field_errors(json!({ "teacher": "email" })));
    }

    #[tokio::test]
    async fn bad_notification_shape() {
        let app = test_app();
        let expected = json!("One or more field(s) is of the wrong type or format: notification");

        for note in [
            "hello world @tagged1@gmail.com @tagged2@gmail.com thisshouldnotbehere",
            "@tagged@gmail.com hello world",
            "hello world @wrongformat.com",
            "hello world @",
        ] {
            let (status, resp) = post(&app, json!({
                "teacher": "teacher@gmail.com",
                "notification": note,
            })).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", note);
            assert_eq!(message(&resp), &expected, "{}", note);
        }
    }

    #[tokio::test]
    async fn unreachable_database() {
        let (status, resp) = post(&unreachable_app(), json!({
            "teacher": "teacher@gmail.com",
            "notification": "hello world @tagged1@gmail.com",
        })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message(&resp), &json!(MESSAGE_DATABASE_ERROR));
    }

    #[tokio::test]
    async fn not_json() {
        let (status, resp) = send(
            &test_app(), Method::POST, "/api/retrievefornotifications", None
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&resp), &json!(MESSAGE_BAD_REQUEST));
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn recipients() {
        ensure_logging();
        let glob = test_glob();
        let store = &glob.store;
        store.ensure_db_schema().await.unwrap();
        store.insert_teacher_with_students(
            "teacher@gmail.com",
            &["nottagged@gmail.com".to_owned(), "ishouldnotappear@gmail.com".to_owned()]
        ).await.unwrap();
        store.insert_teacher_with_students(
            "other@gmail.com",
            &[
                "tagged1@gmail.com".to_owned(),
                "tagged2@gmail.com".to_owned(),
                "suspendedtag@gmail.com".to_owned(),
            ]
        ).await.unwrap();
        store.suspend_student("ishouldnotappear@gmail.com").await.unwrap();
        store.suspend_student("suspendedtag@gmail.com").await.unwrap();

        let app = router(glob.clone());

        let (status, body) = post(&app, json!({
            "teacher": "teacher@gmail.com",
            "notification": "hello world",
        })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap(), json!({ "recipient": ["nottagged@gmail.com"] }));

        let (status, body) = post(&app, json!({
            "teacher": "teacher@gmail.com",
            "notification": "hello world @tagged1@gmail.com @tagged2@gmail.com @tagged1@gmail.com",
        })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.unwrap(),
            json!({ "recipient": ["nottagged@gmail.com", "tagged1@gmail.com", "tagged2@gmail.com"] })
        );

        // Tagging a suspended student, or an unknown one, doesn't help them.
        let (status, body) = post(&app, json!({
            "teacher": "teacher@gmail.com",
            "notification": "hey @suspendedtag@gmail.com @ishouldnotappear@gmail.com @nobody@gmail.com",
        })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap(), json!({ "recipient": ["nottagged@gmail.com"] }));

        // A teacher with no roster still reaches whoever they tag.
        let (status, body) = post(&app, json!({
            "teacher": "stranger@gmail.com",
            "notification": "@tagged2@gmail.com",
        })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap(), json!({ "recipient": ["tagged2@gmail.com"] }));

        let (status, body) = post(&app, json!({
            "teacher": "stranger@gmail.com",
            "notification": "nobody home",
        })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap(), json!({ "recipient": [] }));

        store.nuke_database().await.unwrap();
    }
}
