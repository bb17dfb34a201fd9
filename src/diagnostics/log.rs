//! Process-wide diagnostic log.
//!
//! Append/list/clear store of [`ErrorRecord`]s. Constructed once at startup
//! and injected (`Arc<DiagnosticLog>`) into whatever contains failures;
//! never persisted, cleared only by explicit operator action.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Mutex;

use chrono::Utc;
use log::debug;
use serde::Serialize;
use serde_json::Value;

use super::model::ErrorRecord;

/// Ordered, optionally capacity-bounded store of failure records.
///
/// This is the terminal sink for other components' failures and has no
/// failure modes of its own: [`record`](Self::record) cannot fail and does
/// not panic, even when the payload refuses to serialize or the inner lock
/// was poisoned by a panicking test thread.
pub struct DiagnosticLog {
    records: Mutex<VecDeque<ErrorRecord>>,
    capacity: Option<usize>,
}

impl DiagnosticLog {
    /// Create an unbounded log.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: None,
        }
    }

    /// Create a log that keeps at most `capacity` records, evicting the
    /// oldest first. Guards against unbounded growth in long-lived sessions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    /// Append a failure record with the current timestamp.
    ///
    /// The payload is stored structured when it serializes, otherwise as its
    /// display string. This call never fails.
    pub fn record<E>(&self, source: &str, error: &E)
    where
        E: Serialize + Display + ?Sized,
    {
        let payload =
            serde_json::to_value(error).unwrap_or_else(|_| Value::String(error.to_string()));

        debug!("Recording failure for '{}': {}", source, error);

        let record = ErrorRecord {
            source: source.to_string(),
            error: payload,
            timestamp: Utc::now(),
        };

        let mut records = self.lock();
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            if records.len() == capacity {
                records.pop_front();
            }
        }
        records.push_back(record);
    }

    /// Snapshot of all current records in insertion order.
    pub fn list(&self) -> Vec<ErrorRecord> {
        self.lock().iter().cloned().collect()
    }

    /// Atomically empty the log. A concurrent `record` lands wholly before
    /// or wholly after the clear.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Poisoned locks are recovered: a sink for failures must not add its own.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ErrorRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new()
    }
}
