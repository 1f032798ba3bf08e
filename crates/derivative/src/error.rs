//! Derivative pipeline error types.

use darkroom_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Derivative pipeline errors.
///
/// The first three variants are the caller-visible delivery failures;
/// HTTP glue typically maps `SourceMissing` to 404, `GenerationFailed`
/// to 500, and `LockBusy` to 503 with a Retry-After header.
#[derive(Debug, Error)]
pub enum DerivativeError {
    #[error("source not found: {0}")]
    SourceMissing(String),

    #[error("derivative generation failed: {0}")]
    GenerationFailed(String),

    #[error("derivative generation in progress elsewhere, retry in {}s", .retry_after.as_secs())]
    LockBusy { retry_after: Duration },

    #[error("invalid derivative style: {0}")]
    InvalidStyle(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for derivative operations.
pub type DerivativeResult<T> = std::result::Result<T, DerivativeError>;
