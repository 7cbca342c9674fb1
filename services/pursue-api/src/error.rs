//! Error types for the Pursue API service.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pursue_core::CoreError;
use serde::Serialize;
use serde_json::json;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        let Self::Core(err) = self else {
            return StatusCode::BAD_REQUEST;
        };
        match err {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            e if e.is_policy_denial() => StatusCode::FORBIDDEN,
            CoreError::ChallengeEnded => StatusCode::CONFLICT,
            CoreError::Database(_) | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "VALIDATION_ERROR",
            Self::Core(err) => err.code(),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Core(CoreError::Database(_) | CoreError::Internal(_))
        )
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Core(CoreError::GroupLimitReached {
                current_count,
                limit,
                upgrade_required,
            }) => Some(json!({
                "current_count": current_count,
                "limit": limit,
                "upgrade_required": upgrade_required,
            })),
            _ => None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // The export range check answers with its own flat shape
        if let Self::Core(CoreError::ExportRangeExceeded {
            max_days_allowed,
            requested_days,
        }) = self
        {
            let body = json!({
                "valid": false,
                "error": code,
                "max_days_allowed": max_days_allowed,
                "requested_days": requested_days,
            });
            return (status, Json(body)).into_response();
        }

        let message = if self.is_internal() {
            tracing::error!(error = ?self, "Internal API error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
