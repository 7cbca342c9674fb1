//! Internal job route protection

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::extractors::AuthRejection;
use crate::state::AppState;

/// Header carrying the shared job key
pub const JOB_KEY_HEADER: &str = "x-internal-job-key";

/// Reject any request whose job key does not match, before the body is read
pub async fn require_job_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(JOB_KEY_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if !key_matches(presented, state.config.internal_job_key.as_bytes()) {
        tracing::warn!(path = %request.uri().path(), "Rejected internal job request");
        return AuthRejection::invalid_job_key().into_response();
    }

    next.run(request).await
}

/// Constant-time comparison; an empty expected key never matches
fn key_matches(presented: &[u8], expected: &[u8]) -> bool {
    !expected.is_empty() && bool::from(presented.ct_eq(expected))
}
