use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use classbook_core::models::availability::{
    AbsenceAction, AbsenceChange, AvailableSlotsResponse, BatchAbsenceRequest, BatchAbsenceResult, HorizonReport,
};
use pretty_assertions::assert_eq;

use crate::test_utils::{date, rfc3339, tokyo, TestContext, WithIdentity};

async fn slots(ctx: &TestContext, start: DateTime<Utc>, end: DateTime<Utc>, exclude_booked: bool) -> Vec<DateTime<Utc>> {
    let response = ctx
        .server
        .get(&format!(
            "/api/instructors/{}/available-slots?start={}&end={}&excludeBookedSlots={}",
            ctx.instructor.id,
            rfc3339(start),
            rfc3339(end),
            exclude_booked
        ))
        .await;
    response.assert_status_ok();

    let body = response.json::<AvailableSlotsResponse>();
    assert_eq!(body.instructor_id, ctx.instructor.id);
    body.slots
}

#[tokio::test]
async fn test_available_slots_expand_weekly_schedule() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;

    let all = slots(&ctx, tokyo(10, 26, 0, 0), tokyo(11, 9, 0, 0), false).await;
    assert_eq!(all, vec![tokyo(10, 26, 17, 0), tokyo(11, 2, 17, 0)]);

    ctx.book(tokyo(10, 26, 17, 0)).await;
    let free = slots(&ctx, tokyo(10, 26, 0, 0), tokyo(11, 9, 0, 0), true).await;
    assert_eq!(free, vec![tokyo(11, 2, 17, 0)]);
}

#[tokio::test]
async fn test_inverted_range_is_rejected() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server
        .get(&format!(
            "/api/instructors/{}/available-slots?start={}&end={}",
            ctx.instructor.id,
            rfc3339(tokyo(11, 9, 0, 0)),
            rfc3339(tokyo(10, 26, 0, 0))
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_absences_report_per_item_outcomes() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00"), (4, "17:00")]).await;
    let booked = ctx.book(tokyo(10, 29, 17, 0)).await;

    let request = BatchAbsenceRequest {
        changes: vec![
            AbsenceChange { date_time: tokyo(10, 26, 17, 0), action: AbsenceAction::Add },
            AbsenceChange { date_time: booked.date_time, action: AbsenceAction::Add },
        ],
    };
    let response = ctx
        .server
        .post(&format!("/api/instructors/{}/absences/batch", ctx.instructor.id))
        .as_user(ctx.as_instructor())
        .json(&request)
        .await;
    response.assert_status_ok();

    let result = response.json::<BatchAbsenceResult>();
    assert_eq!(result.success_count.add, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].date_time, booked.date_time);

    let remaining = slots(&ctx, tokyo(10, 26, 0, 0), tokyo(11, 2, 0, 0), false).await;
    assert_eq!(remaining, vec![tokyo(10, 29, 17, 0)]);
}

#[tokio::test]
async fn test_customers_cannot_edit_absences() {
    let ctx = TestContext::new().await;
    let response = ctx
        .server
        .post(&format!("/api/instructors/{}/absences/batch", ctx.instructor.id))
        .as_user(ctx.as_customer())
        .json(&BatchAbsenceRequest { changes: vec![] })
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_extend_availability_is_admin_only() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;
    let path = format!("/api/instructors/{}/availability/extend", ctx.instructor.id);

    ctx.server
        .post(&path)
        .as_user(ctx.as_instructor())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    ctx.clock.set(tokyo(10, 26, 10, 0));
    let response = ctx.server.post(&path).as_user(ctx.admin()).await;
    response.assert_status_ok();

    let report = response.json::<HorizonReport>();
    assert_eq!(report.availabilities_created, 1);
    assert_eq!(report.classes_created, 0);
}
