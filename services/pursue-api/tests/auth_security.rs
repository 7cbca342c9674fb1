//! Bearer token and internal job key checks

mod common;

use axum::http::{Method, StatusCode};
use common::{token_for, TestApp, JOB_KEY};
use uuid::Uuid;

// ============================================================================
// Bearer tokens
// ============================================================================

#[tokio::test]
async fn test_missing_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/api/users/me/subscription", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let app = TestApp::new();
    let user = app.user("mallory").await;
    let forged = token_for(user.id, "not-the-secret");
    let (status, body) = app
        .send(Method::GET, "/api/users/me/subscription", Some(&forged), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_garbage_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/api/groups", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_unknown_subject() {
    let app = TestApp::new();
    let ghost = token_for(Uuid::new_v4(), common::JWT_SECRET);
    let (status, body) = app
        .send(Method::GET, "/api/users/me/subscription", Some(&ghost), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");
}

// ============================================================================
// Internal job key
// ============================================================================

#[tokio::test]
async fn test_job_without_key_rejected() {
    let app = TestApp::new();
    for job in ["weekly-recap", "challenge-status-update", "subscription-expiry"] {
        let (status, body) = app.job(job, None, "{}").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{job}");
        assert_eq!(body["error"]["code"], "INVALID_JOB_KEY");
    }
}

#[tokio::test]
async fn test_job_key_checked_before_body() {
    let app = TestApp::new();
    let (status, body) = app.job("weekly-recap", Some("wrong"), "{not json").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_JOB_KEY");
}

#[tokio::test]
async fn test_user_token_does_not_open_jobs() {
    let app = TestApp::new();
    let user = app.user("user").await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/internal/jobs/weekly-recap",
            Some(&user.token),
            Some(serde_json::json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_JOB_KEY");
}

#[tokio::test]
async fn test_jobs_run_with_key() {
    let app = TestApp::new();

    let (status, body) = app.job("weekly-recap", Some(JOB_KEY), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groups_processed"], 0);

    let (status, body) = app
        .job(
            "challenge-status-update",
            Some(JOB_KEY),
            r#"{"as_of": "2026-01-15"}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activated"], 0);

    let (status, body) = app.job("subscription-expiry", Some(JOB_KEY), "{}").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users_synced"], 0);
}

#[tokio::test]
async fn test_job_bad_date() {
    let app = TestApp::new();
    let (status, body) = app
        .job("weekly-recap", Some(JOB_KEY), r#"{"as_of": "yesterday"}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// ============================================================================
// Probes
// ============================================================================

#[tokio::test]
async fn test_probes_need_no_auth() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["storage"]["status"], "ok");
}
