//! Core error types for the resilience layer.
//!
//! Failure taxonomy: [`FetchError`] for category feed operations,
//! [`StoreError`] for preference store I/O, [`ComputeError`] for cached
//! derivations. Fetch and remote store failures are contained (recorded to
//! the diagnostic log, surfaced as "no data" / "value unchanged");
//! compute failures propagate to the awaiting caller.

use serde::Serialize;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the resilience layer.
#[derive(Error, Debug, Clone, Serialize)]
pub enum Error {
    #[error("Feed fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Preference store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Cached computation failed: {0}")]
    Compute(#[from] ComputeError),
}

/// Errors from a named category's feed operation.
///
/// These are always contained by the orchestrator: the failing category
/// degrades to "no data" and the failure is recorded to the diagnostic log.
#[derive(Error, Debug, Clone, Serialize)]
pub enum FetchError {
    /// The remote source did not answer in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The remote source is unreachable.
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// The remote source answered with data we could not interpret.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Errors from local or remote preference store I/O.
#[derive(Error, Debug, Clone, Serialize)]
pub enum StoreError {
    /// The remote store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The remote store rejected the request.
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl StoreError {
    /// Create an unavailable error from any message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a rejection error from status and message.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Error from a cached derivation.
///
/// Cloneable because every caller awaiting the same in-flight key receives
/// the same failure.
#[derive(Error, Debug, Clone, Serialize)]
#[error("compute failed: {message}")]
pub struct ComputeError {
    /// What the derivation reported when it failed.
    pub message: String,
}

impl ComputeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<FetchError> for ComputeError {
    fn from(err: FetchError) -> Self {
        Self::new(err.to_string())
    }
}
