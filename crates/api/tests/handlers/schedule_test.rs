use axum::http::StatusCode;
use classbook_core::models::schedule::{ScheduleWithSlots, TerminateAvailabilityResponse};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::test_utils::{date, tokyo, TestContext, WithIdentity};

#[tokio::test]
async fn test_create_and_list_schedule_versions() {
    let ctx = TestContext::new().await;
    let first = ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;
    let second = ctx.schedule(date(2026, 11, 9), &[(1, "18:00"), (3, "09:00")]).await;

    assert_eq!(second.slots.len(), 2);

    let response = ctx
        .server
        .get(&format!("/api/instructors/{}/schedules", ctx.instructor.id))
        .await;
    response.assert_status_ok();

    let versions = response.json::<Vec<ScheduleWithSlots>>();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].schedule.id, first.schedule.id);
    assert_eq!(versions[0].schedule.effective_to, Some(date(2026, 11, 9)));
    assert_eq!(versions[1].schedule.effective_to, None);
}

#[tokio::test]
async fn test_schedule_json_is_flat() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;

    let body = ctx
        .server
        .get(&format!("/api/instructors/{}/schedules", ctx.instructor.id))
        .await
        .json::<Value>();

    assert_eq!(body[0]["effectiveFrom"], "2026-10-26");
    assert_eq!(body[0]["effectiveTo"], Value::Null);
    assert_eq!(body[0]["slots"][0]["startTime"], "17:00");
}

#[tokio::test]
async fn test_new_version_must_start_after_the_open_one() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 11, 2), &[(1, "17:00")]).await;

    let response = ctx
        .server
        .post(&format!("/api/instructors/{}/schedules", ctx.instructor.id))
        .as_user(ctx.as_instructor())
        .json(&json!({ "effectiveFrom": "2026-10-26", "slots": [{ "weekday": 1, "startTime": "18:00" }] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_weekday_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server
        .post(&format!("/api/instructors/{}/schedules", ctx.instructor.id))
        .as_user(ctx.admin())
        .json(&json!({ "effectiveFrom": "2026-10-26", "slots": [{ "weekday": 7, "startTime": "18:00" }] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().starts_with("Validation error"));
}

#[tokio::test]
async fn test_terminate_is_refused_while_booked() {
    let ctx = TestContext::new().await;
    let version = ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;
    let class = ctx.book(tokyo(11, 16, 17, 0)).await;
    let path = format!(
        "/api/instructors/{}/schedules/{}/terminate",
        ctx.instructor.id, version.schedule.id
    );

    let refused = ctx
        .server
        .post(&path)
        .as_user(ctx.as_instructor())
        .json(&json!({ "endAt": "2026-11-09" }))
        .await;
    refused.assert_status(StatusCode::CONFLICT);
    let body = refused.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("2026-11-16T08:00:00Z"));

    ctx.server
        .post(&format!("/api/classes/{}/cancel", class.id))
        .as_user(ctx.as_instructor())
        .await
        .assert_status_ok();

    let response = ctx
        .server
        .post(&path)
        .as_user(ctx.as_instructor())
        .json(&json!({ "endAt": "2026-11-09" }))
        .await;
    response.assert_status_ok();

    let terminated = response.json::<TerminateAvailabilityResponse>();
    assert_eq!(terminated.schedule.effective_to, Some(date(2026, 11, 9)));
    assert!(terminated.removed_availabilities > 0);
}
