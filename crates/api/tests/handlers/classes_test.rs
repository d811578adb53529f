use async_trait::async_trait;
use axum::http::StatusCode;
use classbook_core::{
    errors::{messages, BookingResult},
    notify::{Notification, Notifier},
    models::class::{BookingOutcome, Class, ClassStatus, ConflictCheck, ConflictCheckRequest, RebookClassRequest, RebookOutcome},
};
use mockall::mock;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::test_utils::{date, tokyo, TestContext, WithIdentity};

#[tokio::test]
async fn test_book_class_returns_created() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;

    let class = ctx.book(tokyo(11, 2, 17, 0)).await;
    assert_eq!(class.status, ClassStatus::Booked);
    assert_eq!(class.child_ids, vec![ctx.child.id]);
    assert!(ctx.store.snapshot().await.classes.contains_key(&class.id));
}

#[tokio::test]
async fn test_taken_slot_returns_contract_message() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;
    ctx.book(tokyo(11, 2, 17, 0)).await;

    let response = ctx
        .server
        .post("/api/classes")
        .as_user(ctx.as_customer())
        .json(&ctx.booking(tokyo(11, 2, 17, 0)))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": messages::INSTRUCTOR_UNAVAILABLE }));
}

#[tokio::test]
async fn test_child_conflict_needs_confirmation() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;
    let other = ctx.store.add_instructor("Mei").await;
    ctx.server
        .post(&format!("/api/instructors/{}/schedules", other.id))
        .as_user(ctx.admin())
        .json(&json!({ "effectiveFrom": "2026-10-26", "slots": [{ "weekday": 1, "startTime": "17:00" }] }))
        .await
        .assert_status(StatusCode::CREATED);
    ctx.book(tokyo(11, 2, 17, 0)).await;

    let mut request = ctx.booking(tokyo(11, 2, 17, 0));
    request.instructor_id = other.id;

    let response = ctx
        .server
        .post("/api/classes")
        .as_user(ctx.as_customer())
        .json(&request)
        .await;
    response.assert_status_ok();
    let BookingOutcome::NeedsConfirmation { conflicts } = response.json::<BookingOutcome>() else {
        panic!("expected a confirmation request");
    };
    assert_eq!(conflicts.conflicting_child_names(), vec!["Hana".to_string()]);

    request.confirmed = true;
    ctx.server
        .post("/api/classes")
        .as_user(ctx.as_customer())
        .json(&request)
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_check_conflicts_reports_blocked_slot() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00")]).await;

    let request = ConflictCheckRequest {
        instructor_id: ctx.instructor.id,
        customer_id: ctx.customer.id,
        date_time: tokyo(11, 3, 17, 0),
        children_ids: vec![ctx.child.id],
        exclude_class_id: None,
    };
    let response = ctx
        .server
        .post("/api/classes/check-conflicts")
        .as_user(ctx.as_customer())
        .json(&request)
        .await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["result"], "blocked");
    assert_eq!(
        response.json::<ConflictCheck>(),
        ConflictCheck::Blocked { reason: messages::INSTRUCTOR_UNAVAILABLE.to_string() }
    );
}

#[tokio::test]
async fn test_cancel_then_rebook_spends_credit() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00"), (4, "17:00")]).await;
    let class = ctx.book(tokyo(11, 5, 17, 0)).await;

    let canceled = ctx
        .server
        .post(&format!("/api/classes/{}/cancel", class.id))
        .as_user(ctx.as_customer())
        .await;
    canceled.assert_status_ok();
    let canceled = canceled.json::<Class>();
    assert_eq!(canceled.status, ClassStatus::CanceledByCustomer);
    assert!(canceled.is_rebookable);

    let request = RebookClassRequest {
        date_time: tokyo(11, 9, 17, 0),
        instructor_id: ctx.instructor.id,
        customer_id: ctx.customer.id,
        children_ids: vec![ctx.child.id],
        confirmed: false,
    };
    let path = format!("/api/classes/{}/rebook", class.id);
    let response = ctx.server.post(&path).as_user(ctx.as_customer()).json(&request).await;
    response.assert_status(StatusCode::CREATED);

    let RebookOutcome::Rebooked { original, class: rebooked } = response.json::<RebookOutcome>() else {
        panic!("expected a rebooking");
    };
    assert_eq!(rebooked.status, ClassStatus::Rebooked);
    assert!(!original.is_rebookable);
    assert_eq!(original.rebooked_class_id, Some(rebooked.id));

    let again = RebookClassRequest { date_time: tokyo(11, 12, 17, 0), ..request };
    let response = ctx.server.post(&path).as_user(ctx.as_customer()).json(&again).await;
    assert!(response.status_code().is_client_error());
}

mock! {
    pub Notifier {}

    #[async_trait]
    impl Notifier for Notifier {
        async fn notify(&self, notification: Notification) -> BookingResult<()>;
    }
}

#[test_log::test(tokio::test)]
async fn test_cancellation_is_announced_with_the_credit_deadline() {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .withf(|n| matches!(n, Notification::ClassBooked { .. }))
        .times(1)
        .returning(|_| Ok(()));
    notifier
        .expect_notify()
        .withf(|n| matches!(n, Notification::ClassCanceled { rebookable_until: Some(_), .. }))
        .times(1)
        .returning(|_| Ok(()));

    let ctx = TestContext::with_notifier(Arc::new(notifier)).await;
    ctx.schedule(date(2026, 10, 26), &[(4, "17:00")]).await;
    let class = ctx.book(tokyo(11, 5, 17, 0)).await;

    ctx.server
        .post(&format!("/api/classes/{}/cancel", class.id))
        .as_user(ctx.as_customer())
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_customer_cannot_cancel_on_class_day() {
    let ctx = TestContext::new().await;
    ctx.schedule(date(2026, 10, 26), &[(4, "17:00")]).await;
    let class = ctx.book(tokyo(11, 5, 17, 0)).await;

    ctx.clock.set(tokyo(11, 5, 9, 0));
    let response = ctx
        .server
        .post(&format!("/api/classes/{}/cancel", class.id))
        .as_user(ctx.as_customer())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": messages::CANCELLATION_TOO_LATE }));
}
