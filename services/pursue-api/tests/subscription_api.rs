//! Subscription limits and the downgrade flow over HTTP

mod common;

use axum::http::StatusCode;
use common::{unique, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_free_user_second_group_blocked() {
    let app = TestApp::new();
    let user = app.user("free").await;

    let (status, _) = app.create_group(&user, &unique("First")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.create_group(&user, &unique("Second")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "GROUP_LIMIT_REACHED");
    assert_eq!(body["error"]["details"]["current_count"], 1);
    assert_eq!(body["error"]["details"]["limit"], 1);
    assert_eq!(body["error"]["details"]["upgrade_required"], true);

    let (status, body) = app
        .get("/api/users/me/subscription/eligibility", &user)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_create_group"], false);
}

#[tokio::test]
async fn test_premium_user_capped_at_ten() {
    let app = TestApp::new();
    let user = app.premium_user("premium").await;

    for i in 0..10 {
        let (status, _) = app.create_group(&user, &unique(&format!("G{i}"))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = app.create_group(&user, &unique("Eleventh")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"]["upgrade_required"], false);
}

#[tokio::test]
async fn test_unknown_product() {
    let app = TestApp::new();
    let user = app.user("buyer").await;
    let (status, body) = app
        .post(
            "/api/subscriptions/upgrade",
            &user,
            json!({ "product_id": "pursue_lifetime" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PRODUCT");
}

#[tokio::test]
async fn test_cancel_without_subscription() {
    let app = TestApp::new();
    let user = app.user("nobody").await;
    let (status, body) = app
        .post("/api/subscriptions/cancel", &user, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SUBSCRIPTION_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_body() {
    let app = TestApp::new();
    let user = app.user("typo").await;
    let (status, body) = app
        .post("/api/subscriptions/upgrade", &user, json!({ "product": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_downgrade_selection_flow() {
    let app = TestApp::new();
    let user = app.premium_user("lapsing").await;

    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        let (status, body) = app.create_group(&user, &unique(name)).await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["id"].as_str().unwrap().to_string());
    }
    app.lapse_premium(&user).await;

    let (_, sub) = app.get("/api/users/me/subscription", &user).await;
    assert_eq!(sub["status"], "over_limit");
    assert_eq!(sub["is_over_limit"], true);

    // writes are blocked until a group is kept
    let (status, body) = app
        .post(
            "/api/goals",
            &user,
            json!({
                "group_id": ids[0],
                "title": "Read",
                "cadence": "daily",
                "metric_type": "binary",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "SUBSCRIPTION_GROUP_SELECTION_REQUIRED");

    let (status, body) = app
        .post(
            "/api/subscriptions/downgrade/select-group",
            &user,
            json!({ "keep_group_id": ids[0] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["kept_group"]["id"], ids[0].as_str());
    let mut removed: Vec<String> = body["removed_groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap().to_string())
        .collect();
    removed.sort();
    let mut expected = vec![ids[1].clone(), ids[2].clone()];
    expected.sort();
    assert_eq!(removed, expected);

    let (status, body) = app
        .post(
            "/api/subscriptions/downgrade/select-group",
            &user,
            json!({ "keep_group_id": ids[1] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (_, sub) = app.get("/api/users/me/subscription", &user).await;
    assert_eq!(sub["is_over_limit"], false);

    let (status, body) = app
        .post(
            "/api/goals",
            &user,
            json!({
                "group_id": ids[1],
                "title": "Read",
                "cadence": "daily",
                "metric_type": "binary",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "GROUP_READ_ONLY");
}

#[tokio::test]
async fn test_export_range_by_tier() {
    let app = TestApp::new();
    let user = app.user("exporter").await;
    let (_, group) = app.create_group(&user, &unique("Export")).await;
    let id = group["id"].as_str().unwrap();

    let (status, body) = app
        .get(
            &format!(
                "/api/groups/{id}/export-progress/validate-range?start_date=2026-01-01&end_date=2026-01-30"
            ),
            &user,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, body) = app
        .get(
            &format!(
                "/api/groups/{id}/export-progress/validate-range?start_date=2026-01-01&end_date=2026-12-31"
            ),
            &user,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["valid"], false);
    assert_eq!(body["error"], "date_range_exceeds_tier_limit");
    assert_eq!(body["max_days_allowed"], 30);
    assert_eq!(body["requested_days"], 365);
}
