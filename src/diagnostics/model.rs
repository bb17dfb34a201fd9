//! Diagnostic record model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A single recorded failure.
///
/// Immutable once appended: the log hands out clones, never references into
/// its own storage.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Logical operation that failed, e.g. "funding-news-fetch".
    pub source: String,

    /// Structured failure payload. Payloads that cannot be serialized are
    /// coerced to their display string before they get here.
    pub error: Value,

    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}
