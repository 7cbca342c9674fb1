//! Pursue API
//!
//! REST surface over `pursue-core`.
//!
//! ## REST Endpoints
//!
//! - `GET /api/users/me/subscription` - Tier, status and limits
//! - `GET /api/users/me/subscription/eligibility` - Create/join eligibility
//! - `POST /api/subscriptions/upgrade` - Simulated premium purchase
//! - `POST /api/subscriptions/cancel` - Cancel premium
//! - `POST /api/subscriptions/downgrade/select-group` - Resolve over-limit
//! - `POST|GET /api/groups`, `GET /api/groups/{id}` - Groups
//! - `POST /api/groups/{id}/join`, `POST /api/groups/join` - Join
//! - `POST /api/groups/{id}/members/{user_id}/approve` - Approve pending
//! - `DELETE /api/groups/{id}/members/me|{user_id}` - Leave / remove
//! - `GET /api/groups/{id}/heat|activity|goals` - Group reads
//! - `GET /api/groups/{id}/export-progress/validate-range` - Export check
//! - `POST|GET /api/challenges`, `GET /api/challenges/templates` - Challenges
//! - `POST /api/challenges/{id}/cancel`, `GET /api/challenges/{id}/share-card`
//! - `POST /api/goals`, `PATCH|DELETE /api/goals/{id}` - Goals
//! - `POST /api/progress` - Log progress
//! - `POST|DELETE /api/activities/{id}/reactions` - Reactions
//! - `POST /api/internal/jobs/*` - Jobs, gated by `x-internal-job-key`
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use crate::config::{Config, ConfigError, Storage};
pub use crate::state::AppState;

use crate::handlers::{health, ready};

/// Build the HTTP router
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let subscription_routes = Router::new()
        .route("/users/me/subscription", get(handlers::get_subscription))
        .route(
            "/users/me/subscription/eligibility",
            get(handlers::get_eligibility),
        )
        .route("/subscriptions/upgrade", post(handlers::upgrade))
        .route("/subscriptions/cancel", post(handlers::cancel))
        .route(
            "/subscriptions/downgrade/select-group",
            post(handlers::select_group),
        );

    let group_routes = Router::new()
        .route(
            "/groups",
            post(handlers::create_group).get(handlers::list_groups),
        )
        .route("/groups/recommendations", get(handlers::recommendations))
        .route("/groups/join", post(handlers::join_by_invite_code))
        .route("/groups/{id}", get(handlers::get_group))
        .route("/groups/{id}/join", post(handlers::join_group))
        .route(
            "/groups/{id}/members/{user_id}/approve",
            post(handlers::approve_member),
        )
        .route("/groups/{id}/members/me", delete(handlers::leave_group))
        .route(
            "/groups/{id}/members/{user_id}",
            delete(handlers::remove_member),
        )
        .route("/groups/{id}/heat", get(handlers::get_heat))
        .route("/groups/{id}/activity", get(handlers::get_activity_feed))
        .route("/groups/{id}/goals", get(handlers::list_goals))
        .route(
            "/groups/{id}/export-progress/validate-range",
            get(handlers::validate_export_range),
        );

    let challenge_routes = Router::new()
        .route(
            "/challenges",
            post(handlers::create_challenge).get(handlers::list_challenges),
        )
        .route("/challenges/templates", get(handlers::list_templates))
        .route("/challenges/{id}", get(handlers::get_challenge))
        .route("/challenges/{id}/cancel", post(handlers::cancel_challenge))
        .route("/challenges/{id}/share-card", get(handlers::get_share_card));

    let goal_routes = Router::new()
        .route("/goals", post(handlers::create_goal))
        .route(
            "/goals/{id}",
            patch(handlers::update_goal).delete(handlers::archive_goal),
        )
        .route("/progress", post(handlers::log_progress))
        .route(
            "/activities/{id}/reactions",
            post(handlers::add_reaction).delete(handlers::remove_reaction),
        );

    // Job routes (key checked before any body parsing)
    let job_routes = Router::new()
        .route("/weekly-recap", post(handlers::run_weekly_recap))
        .route(
            "/challenge-status-update",
            post(handlers::run_challenge_status_update),
        )
        .route(
            "/subscription-expiry",
            post(handlers::run_subscription_expiry),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_job_key,
        ));

    let api = Router::new()
        .merge(subscription_routes)
        .merge(group_routes)
        .merge(challenge_routes)
        .merge(goal_routes)
        .nest("/internal/jobs", job_routes);

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api", api)
        .layer(layers)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
