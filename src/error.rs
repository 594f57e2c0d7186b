use thiserror::Error;

/// Failures that cross service boundaries.
///
/// Insufficient history and unknown indicators are not errors; they yield
/// non-triggered evaluations. A rejected signal is a verdict, not an `Err`.
/// Nothing here is fatal to the hosting process.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Provider fetch failed. Recoverable: the next cycle retries.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// A store write or read failed for one item; the batch continues.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Notification dispatch failed. Logged by callers, never propagated
    /// into a batch result.
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
}
