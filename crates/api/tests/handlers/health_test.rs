use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::test_utils::TestContext;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await;
    let response = ctx.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_version_reports_business_timezone() {
    let ctx = TestContext::new().await;
    let body = ctx.server.get("/version").await.json::<Value>();

    assert_eq!(body["name"], "classbook-api");
    assert_eq!(body["businessTimezone"], "Asia/Tokyo");
}
