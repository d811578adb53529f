use axum::http::StatusCode;
use classbook_core::{
    errors::messages,
    models::class::{CreateRecurringClassRequest, EditRecurringClassRequest, EditRecurringClassResponse, RecurringClass},
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};

use crate::test_utils::{date, TestContext, WithIdentity};

async fn create_recurring(ctx: &TestContext) -> RecurringClass {
    ctx.schedule(date(2026, 10, 26), &[(1, "17:00"), (4, "18:00")]).await;
    let subscription = ctx.store.add_subscription(ctx.customer.id).await;
    let request = CreateRecurringClassRequest {
        subscription_id: subscription.id,
        instructor_id: ctx.instructor.id,
        weekday: 1,
        start_time: "17:00".parse().unwrap(),
        start_date: date(2026, 10, 26),
        timezone: "Asia/Tokyo".to_string(),
        children_ids: vec![ctx.child.id],
    };

    let response = ctx
        .server
        .post("/api/recurring-classes")
        .as_user(ctx.as_customer())
        .json(&request)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

fn edit(ctx: &TestContext) -> EditRecurringClassRequest {
    EditRecurringClassRequest {
        instructor_id: ctx.instructor.id,
        weekday: 4,
        start_time: "18:00".parse().unwrap(),
        start_date: date(2026, 11, 2),
        timezone: "Asia/Tokyo".to_string(),
        children_ids: None,
    }
}

#[tokio::test]
async fn test_create_recurring_class_materializes_instances() {
    let ctx = TestContext::new().await;
    let rc = create_recurring(&ctx).await;

    assert_eq!(rc.end_at, None);
    let instances = ctx
        .store
        .snapshot()
        .await
        .classes
        .values()
        .filter(|c| c.recurring_class_id == Some(rc.id))
        .count();
    assert_eq!(instances, 11);
}

#[tokio::test]
async fn test_edit_recurring_class_splits_interval() {
    let ctx = TestContext::new().await;
    let rc = create_recurring(&ctx).await;

    let response = ctx
        .server
        .put(&format!("/api/recurring-classes/{}", rc.id))
        .as_user(ctx.as_customer())
        .json(&edit(&ctx))
        .await;
    response.assert_status_ok();

    let body = response.json::<EditRecurringClassResponse>();
    assert_eq!(body.old_recurring_class.end_at, Some(date(2026, 11, 2)));
    assert_eq!(body.new_recurring_class.start_at, date(2026, 11, 2));
    assert_eq!(body.new_recurring_class.weekday, 4);
}

#[rstest]
#[case::wrong_timezone(json!({ "timezone": "Europe/London" }), "Only Asia/Tokyo timezone is supported")]
#[case::too_soon(json!({ "startDate": "2026-10-22" }), messages::START_DATE_TOO_SOON)]
#[case::slot_not_offered(json!({ "weekday": 3 }), messages::INSTRUCTOR_UNAVAILABLE)]
#[tokio::test]
async fn test_edit_rejections_use_contract_messages(#[case] patch: Value, #[case] expected: &str) {
    let ctx = TestContext::new().await;
    let rc = create_recurring(&ctx).await;

    let mut body = serde_json::to_value(edit(&ctx)).unwrap();
    if let (Some(target), Some(fields)) = (body.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }

    let response = ctx
        .server
        .put(&format!("/api/recurring-classes/{}", rc.id))
        .as_user(ctx.as_customer())
        .json(&body)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": expected }));
    assert_eq!(ctx.store.snapshot().await.recurring_classes[&rc.id].end_at, None);
}

#[tokio::test]
async fn test_duplicate_recurring_class_is_rejected() {
    let ctx = TestContext::new().await;
    let rc = create_recurring(&ctx).await;
    let other = ctx.store.add_customer("Kato").await;
    let other_child = ctx.store.add_child(other.id, "Riku").await;
    let subscription = ctx.store.add_subscription(other.id).await;

    let request = CreateRecurringClassRequest {
        subscription_id: subscription.id,
        instructor_id: rc.instructor_id,
        weekday: rc.weekday,
        start_time: rc.start_time,
        start_date: date(2026, 11, 2),
        timezone: "Asia/Tokyo".to_string(),
        children_ids: vec![other_child.id],
    };
    let response = ctx
        .server
        .post("/api/recurring-classes")
        .as_user(ctx.admin())
        .json(&request)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": messages::DUPLICATE_RECURRING_CLASS }));
}
