//! Challenge handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use pursue_core::challenge::ChallengeTemplate;
use pursue_core::{GroupView, NewChallenge, ShareCardView};
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
pub struct CreateChallengeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeListResponse {
    pub challenges: Vec<GroupView>,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: &'static [ChallengeTemplate],
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/challenges
#[instrument(skip(state, req), fields(user_id = %user.user_id, template_id = ?req.template_id))]
pub async fn create_challenge(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateChallengeRequest>,
) -> ApiResult<(StatusCode, Json<GroupView>)> {
    timed("create_challenge", async {
        let challenge = state
            .services
            .challenges
            .create_challenge(
                user.user_id,
                NewChallenge {
                    name: req.name,
                    description: req.description,
                    template_id: req.template_id,
                    start_date: req.start_date,
                    end_date: req.end_date,
                },
            )
            .await?;
        Ok((StatusCode::CREATED, Json(challenge)))
    })
    .await
}

/// GET /api/challenges
pub async fn list_challenges(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ChallengeListResponse>> {
    let challenges = state
        .services
        .challenges
        .list_challenges(user.user_id)
        .await?;
    Ok(Json(ChallengeListResponse { challenges }))
}

/// GET /api/challenges/templates
pub async fn list_templates(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Json<TemplateListResponse> {
    Json(TemplateListResponse {
        templates: state.services.challenges.templates(),
    })
}

/// GET /api/challenges/:id
pub async fn get_challenge(
    State(state): State<AppState>,
    user: AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> ApiResult<Json<GroupView>> {
    Ok(Json(
        state
            .services
            .challenges
            .get_challenge(user.user_id, challenge_id)
            .await?,
    ))
}

/// POST /api/challenges/:id/cancel
#[instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn cancel_challenge(
    State(state): State<AppState>,
    user: AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> ApiResult<Json<GroupView>> {
    Ok(Json(
        state
            .services
            .challenges
            .cancel_challenge(user.user_id, challenge_id)
            .await?,
    ))
}

/// GET /api/challenges/:id/share-card
pub async fn get_share_card(
    State(state): State<AppState>,
    user: AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> ApiResult<Json<ShareCardView>> {
    Ok(Json(
        state
            .services
            .challenges
            .share_card(user.user_id, challenge_id)
            .await?,
    ))
}
