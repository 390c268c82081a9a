use std::time::Duration;

use thiserror::Error;

/// Errors returned synchronously from the submission and query surface.
///
/// Tool failures are deliberately absent: once `submit` has returned, a
/// failed tool run is only observable through the job's `failed` status
/// and `error_message` on a later query.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("rate limit exceeded, retry in {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("scan not found")]
    NotFound,

    #[error("record store failure: {0}")]
    Store(#[source] anyhow::Error),
}
