//! Shared handler utilities

use std::time::Instant;

use crate::error::ApiResult;

// ============================================================================
// Metrics Helpers
// ============================================================================

/// Record HTTP operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "pursue_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

/// Time a handler body and record its outcome
pub async fn timed<T, F>(operation: &'static str, fut: F) -> ApiResult<T>
where
    F: std::future::Future<Output = ApiResult<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    record_op_duration(operation, start, result.is_ok());
    result
}

// ============================================================================
// Pagination
// ============================================================================

/// `?limit=` query for feeds
#[derive(Debug, Default, serde::Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}
