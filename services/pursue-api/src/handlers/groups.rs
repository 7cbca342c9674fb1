//! Group and membership handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use pursue_core::{
    ExportRange, GroupDetail, GroupListItem, GroupView, JoinResult, MembershipView, NewGroup,
};
use pursue_types::Visibility;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, AuthUser};
use crate::handlers::shared::timed;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

#[derive(Debug, Deserialize)]
pub struct JoinByCodeRequest {
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<GroupListItem>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub groups: Vec<GroupView>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/groups
#[instrument(skip(state, req), fields(user_id = %user.user_id))]
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<GroupView>)> {
    timed("create_group", async {
        let group = state
            .services
            .groups
            .create_group(
                user.user_id,
                NewGroup {
                    name: req.name,
                    description: req.description,
                    visibility: req.visibility,
                },
            )
            .await?;
        Ok((StatusCode::CREATED, Json(group)))
    })
    .await
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<GroupListResponse>> {
    let groups = state.services.groups.list_my_groups(user.user_id).await?;
    Ok(Json(GroupListResponse { groups }))
}

/// GET /api/groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<GroupDetail>> {
    Ok(Json(
        state.services.groups.get_group(user.user_id, group_id).await?,
    ))
}

/// GET /api/groups/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<RecommendationsResponse>> {
    let groups = state.services.groups.recommendations(user.user_id).await?;
    Ok(Json(RecommendationsResponse { groups }))
}

/// POST /api/groups/:id/join
#[instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn join_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<JoinResult>> {
    timed("join_group", async {
        Ok(Json(
            state.services.groups.join_group(user.user_id, group_id).await?,
        ))
    })
    .await
}

/// POST /api/groups/join
#[instrument(skip(state, req), fields(user_id = %user.user_id))]
pub async fn join_by_invite_code(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<JoinByCodeRequest>,
) -> ApiResult<Json<JoinResult>> {
    timed("join_group", async {
        Ok(Json(
            state
                .services
                .groups
                .join_by_invite_code(user.user_id, &req.invite_code)
                .await?,
        ))
    })
    .await
}

/// POST /api/groups/:id/members/:user_id/approve
pub async fn approve_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((group_id, target_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MembershipView>> {
    Ok(Json(
        state
            .services
            .groups
            .approve_member(user.user_id, group_id, target_id)
            .await?,
    ))
}

/// DELETE /api/groups/:id/members/me
pub async fn leave_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.groups.leave_group(user.user_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/groups/:id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path((group_id, target_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .services
        .groups
        .remove_member(user.user_id, group_id, target_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/groups/:id/export-progress/validate-range
pub async fn validate_export_range(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
    Query(range): Query<ExportRangeQuery>,
) -> ApiResult<Json<ExportRange>> {
    Ok(Json(
        state
            .services
            .groups
            .validate_export_range(user.user_id, group_id, range.start_date, range.end_date)
            .await?,
    ))
}
