use axum::http::StatusCode;
use classbook_core::models::people::Identity;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::test_utils::{date, TestContext, WithIdentity};

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server
        .post(&format!("/api/instructors/{}/schedules", ctx.instructor.id))
        .json(&json!({ "effectiveFrom": "2026-10-26", "slots": [] }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("x-user-id"));
}

#[tokio::test]
async fn test_unknown_instructor_is_not_found() {
    let ctx = TestContext::new().await;
    let missing = Uuid::new_v4();
    let response = ctx
        .server
        .get(&format!(
            "/api/instructors/{missing}/available-slots?start=2026-10-26T00:00:00Z&end=2026-11-09T00:00:00Z"
        ))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "error": format!("Resource not found: Instructor with ID {missing} not found") })
    );
}

#[tokio::test]
async fn test_foreign_instructor_is_forbidden() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server
        .post(&format!("/api/instructors/{}/schedules", ctx.instructor.id))
        .as_user(Identity::instructor(Uuid::new_v4()))
        .json(&json!({ "effectiveFrom": date(2026, 10, 26), "slots": [] }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_body_is_rejected_before_the_service() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server
        .post(&format!("/api/instructors/{}/schedules", ctx.instructor.id))
        .as_user(ctx.as_instructor())
        .json(&json!({ "effectiveFrom": "2026-10-26", "slots": [{ "weekday": 1, "startTime": "5pm" }] }))
        .await;

    assert!(response.status_code().is_client_error());
    assert!(ctx.store.snapshot().await.schedules.is_empty());
}
