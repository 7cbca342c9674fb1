//! Router wired to an in-memory store, plus token minting

#![allow(dead_code)]

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use pursue_api::extractors::Claims;
use pursue_api::middleware::JOB_KEY_HEADER;
use pursue_api::{build_router, AppState, Config, Storage};
use pursue_core::CoreConfig;
use pursue_db::{CreateSubscription, CreateUser, MemoryStore, Repositories};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const JOB_KEY: &str = "test-job-key";

pub struct TestApp {
    pub router: Router,
    pub repos: Repositories,
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub fn test_config() -> Config {
    Config {
        http_port: 0,
        storage: Storage::Memory,
        database_url: None,
        db_max_connections: 1,
        run_migrations: false,
        jwt_secret: JWT_SECRET.to_string(),
        internal_job_key: JOB_KEY.to_string(),
        request_timeout: Duration::from_secs(5),
        metrics_enabled: false,
        core: CoreConfig::new(),
    }
}

pub fn token_for(user_id: Uuid, secret: &str) -> String {
    let claims = Claims {
        sub: user_id,
        exp: Utc::now().timestamp() + 3600,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        let repos = Repositories::in_memory(MemoryStore::new());
        let state = AppState::new(repos.clone(), test_config());
        Self {
            router: build_router(state, None),
            repos,
        }
    }

    pub async fn user(&self, name: &str) -> TestUser {
        let id = Uuid::new_v4();
        self.repos
            .users
            .create(CreateUser {
                id,
                display_name: name.to_string(),
            })
            .await
            .unwrap();
        TestUser {
            id,
            token: token_for(id, JWT_SECRET),
        }
    }

    pub async fn premium_user(&self, name: &str) -> TestUser {
        let user = self.user(name).await;
        let (status, _) = self
            .post(
                "/api/subscriptions/upgrade",
                &user,
                serde_json::json!({ "product_id": "pursue_premium_monthly" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        user
    }

    /// Swap the user's subscription for one that already expired
    pub async fn lapse_premium(&self, user: &TestUser) {
        self.repos
            .subscriptions
            .create_replacing(CreateSubscription {
                id: Uuid::new_v4(),
                user_id: user.id,
                tier: "premium".to_string(),
                platform: "simulated".to_string(),
                product_id: "pursue_premium_monthly".to_string(),
                expires_at: Utc::now() - chrono::Duration::minutes(1),
            })
            .await
            .unwrap();
    }

    pub async fn create_group(&self, user: &TestUser, name: &str) -> (StatusCode, Value) {
        self.post(
            "/api/groups",
            user,
            serde_json::json!({ "name": name, "visibility": "public" }),
        )
        .await
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    pub async fn job(&self, name: &str, key: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/internal/jobs/{name}"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header(JOB_KEY_HEADER, key);
        }
        self.call(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix} {}", &Uuid::new_v4().simple().to_string()[..6])
}
