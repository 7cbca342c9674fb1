//! Internal job handlers
//!
//! Routed behind [`crate::middleware::require_job_key`].

use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use pursue_core::{ExpiryReport, RecapReport, StatusUpdateReport};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::OptionalJson;
use crate::handlers::shared::timed;
use crate::state::AppState;

/// Optional job body. Without `as_of` a job runs for the current UTC date.
#[derive(Debug, Default, Deserialize)]
pub struct JobRequest {
    pub as_of: Option<NaiveDate>,
}

impl JobRequest {
    fn date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// POST /api/internal/jobs/weekly-recap
pub async fn run_weekly_recap(
    State(state): State<AppState>,
    OptionalJson(req): OptionalJson<JobRequest>,
) -> ApiResult<Json<RecapReport>> {
    timed("job_weekly_recap", async {
        Ok(Json(
            state.services.activity.run_weekly_recap(req.date()).await?,
        ))
    })
    .await
}

/// POST /api/internal/jobs/challenge-status-update
pub async fn run_challenge_status_update(
    State(state): State<AppState>,
    OptionalJson(req): OptionalJson<JobRequest>,
) -> ApiResult<Json<StatusUpdateReport>> {
    timed("job_challenge_status_update", async {
        Ok(Json(
            state
                .services
                .challenges
                .run_status_update(req.date())
                .await?,
        ))
    })
    .await
}

/// POST /api/internal/jobs/subscription-expiry
pub async fn run_subscription_expiry(
    State(state): State<AppState>,
    OptionalJson(req): OptionalJson<JobRequest>,
) -> ApiResult<Json<ExpiryReport>> {
    let now = match req.as_of {
        Some(day) => day.and_time(NaiveTime::MIN).and_utc(),
        None => Utc::now(),
    };
    timed("job_subscription_expiry", async {
        Ok(Json(state.services.subscriptions.run_expiry(now).await?))
    })
    .await
}
