//! Preference reconciliation models.

use serde::Serialize;

/// Where the current value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreferenceSource {
    /// Built-in fallback; neither store held a usable value.
    Default,
    /// Adopted from the local copy, or written locally this session.
    Local,
    /// Adopted from the authoritative remote store.
    Remote,
}

/// Reconciliation phase for one preference.
///
/// `Uninitialized → LocalLoaded → Reconciled`. An unidentified session
/// never leaves `LocalLoaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncPhase {
    Uninitialized,
    LocalLoaded,
    Reconciled,
}

/// Reconciled in-memory view of one preference.
///
/// This is the component's working state, not itself persisted; the local
/// and remote copies are the two physical stores behind it.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceState<T> {
    pub value: T,
    pub source: PreferenceSource,
    pub phase: SyncPhase,
    /// True while a remote write is in flight: the window in which the
    /// local and remote copies are allowed to disagree.
    pub pending: bool,
}
