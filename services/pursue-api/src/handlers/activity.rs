//! Heat, activity feed and reaction handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pursue_core::{ActivityView, Heat, ReactionOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, AuthUser};
use crate::handlers::shared::LimitQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityFeedResponse {
    pub activities: Vec<ActivityView>,
}

/// GET /api/groups/:id/heat
pub async fn get_heat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Heat>> {
    Ok(Json(
        state.services.activity.heat(user.user_id, group_id).await?,
    ))
}

/// GET /api/groups/:id/activity
pub async fn get_activity_feed(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<ActivityFeedResponse>> {
    let activities = state
        .services
        .activity
        .feed(user.user_id, group_id, query.limit)
        .await?;
    Ok(Json(ActivityFeedResponse { activities }))
}

/// POST /api/activities/:id/reactions
pub async fn add_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<Uuid>,
    ApiJson(req): ApiJson<ReactionRequest>,
) -> ApiResult<(StatusCode, Json<ReactionOutcome>)> {
    let outcome = state
        .services
        .activity
        .react(user.user_id, activity_id, &req.emoji)
        .await?;
    let status = if outcome.replaced {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

/// DELETE /api/activities/:id/reactions
pub async fn remove_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .activity
        .remove_reaction(user.user_id, activity_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
