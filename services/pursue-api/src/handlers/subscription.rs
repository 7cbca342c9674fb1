//! Subscription handlers

use axum::extract::State;
use axum::Json;
use pursue_core::{Eligibility, SelectGroupOutcome, SubscriptionView};
use pursue_types::Platform;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, AuthUser};
use crate::handlers::shared::timed;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub product_id: String,
    pub platform: Option<Platform>,
}

#[derive(Debug, Deserialize)]
pub struct SelectGroupRequest {
    pub keep_group_id: Uuid,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/users/me/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<SubscriptionView>> {
    timed("get_subscription", async {
        Ok(Json(
            state.services.subscriptions.get_subscription(user.user_id).await?,
        ))
    })
    .await
}

/// GET /api/users/me/subscription/eligibility
pub async fn get_eligibility(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Eligibility>> {
    Ok(Json(
        state.services.subscriptions.eligibility(user.user_id).await?,
    ))
}

/// POST /api/subscriptions/upgrade
#[instrument(skip(state, req), fields(user_id = %user.user_id, product_id = %req.product_id))]
pub async fn upgrade(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpgradeRequest>,
) -> ApiResult<Json<SubscriptionView>> {
    timed("upgrade", async {
        let view = state
            .services
            .subscriptions
            .upgrade(user.user_id, &req.product_id, req.platform)
            .await?;
        tracing::info!(tier = %view.tier, "Subscription upgraded");
        Ok(Json(view))
    })
    .await
}

/// POST /api/subscriptions/cancel
#[instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<SubscriptionView>> {
    Ok(Json(state.services.subscriptions.cancel(user.user_id).await?))
}

/// POST /api/subscriptions/downgrade/select-group
#[instrument(skip(state, req), fields(user_id = %user.user_id, keep_group_id = %req.keep_group_id))]
pub async fn select_group(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SelectGroupRequest>,
) -> ApiResult<Json<SelectGroupOutcome>> {
    timed("select_group", async {
        Ok(Json(
            state
                .services
                .subscriptions
                .select_group(user.user_id, req.keep_group_id)
                .await?,
        ))
    })
    .await
}
