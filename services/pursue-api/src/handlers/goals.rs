//! Goal and progress handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use pursue_core::{GoalUpdate, GoalView, NewGoal, NewProgress, ProgressView};
use pursue_types::{Cadence, MetricType};
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
pub struct CreateGoalRequest {
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cadence: Cadence,
    pub metric_type: MetricType,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub active_days: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub active_days: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct LogProgressRequest {
    pub goal_id: Uuid,
    pub value: f64,
    pub entry_date: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GoalListResponse {
    pub goals: Vec<GoalView>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/goals
#[instrument(skip(state, req), fields(user_id = %user.user_id, group_id = %req.group_id))]
pub async fn create_goal(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateGoalRequest>,
) -> ApiResult<(StatusCode, Json<GoalView>)> {
    let goal = state
        .services
        .goals
        .create_goal(
            user.user_id,
            NewGoal {
                group_id: req.group_id,
                title: req.title,
                description: req.description,
                cadence: req.cadence,
                metric_type: req.metric_type,
                target_value: req.target_value,
                unit: req.unit,
                active_days: req.active_days,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

/// PATCH /api/goals/:id
pub async fn update_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(goal_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateGoalRequest>,
) -> ApiResult<Json<GoalView>> {
    let update = GoalUpdate {
        title: req.title,
        description: req.description,
        target_value: req.target_value,
        unit: req.unit,
        active_days: req.active_days,
    };
    Ok(Json(
        state
            .services
            .goals
            .update_goal(user.user_id, goal_id, update)
            .await?,
    ))
}

/// DELETE /api/goals/:id
pub async fn archive_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(goal_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.goals.archive_goal(user.user_id, goal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/groups/:id/goals
pub async fn list_goals(
    State(state): State<AppState>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<GoalListResponse>> {
    let goals = state.services.goals.list_goals(user.user_id, group_id).await?;
    Ok(Json(GoalListResponse { goals }))
}

/// POST /api/progress
/// Hot path
#[instrument(skip(state, req), fields(user_id = %user.user_id, goal_id = %req.goal_id))]
pub async fn log_progress(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<LogProgressRequest>,
) -> ApiResult<(StatusCode, Json<ProgressView>)> {
    timed("log_progress", async {
        let entry = state
            .services
            .goals
            .log_progress(
                user.user_id,
                NewProgress {
                    goal_id: req.goal_id,
                    value: req.value,
                    entry_date: req.entry_date,
                    note: req.note,
                },
            )
            .await?;
        Ok((StatusCode::CREATED, Json(entry)))
    })
    .await
}
