//! Preference reconciliation service.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, warn};

use crate::diagnostics::DiagnosticLog;
use crate::preferences::model::{PreferenceSource, PreferenceState, SyncPhase};
use crate::preferences::traits::{IdentityProvider, LocalPreferenceStore, RemotePreferenceStore};

/// Caller-visible side effect applied on every value transition, e.g.
/// toggling a document-level mode flag. Must be idempotent: it is re-applied
/// on every transition, not only on change, to tolerate re-initialization.
pub type ApplyEffect<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Reconciles one preference between a fast local store and the
/// authoritative remote store.
///
/// Phases run `Uninitialized → LocalLoaded → Reconciled` per session.
/// Remote reads win over local ones (the remote store is the system of
/// record); remote writes are optimistic and never rolled back - a failed
/// write leaves the session on the locally written value and lands in the
/// diagnostic log instead of the UI.
pub struct PreferenceService<T> {
    name: String,
    default: T,
    state: Mutex<PreferenceState<T>>,
    local: Arc<dyn LocalPreferenceStore>,
    remote: Arc<dyn RemotePreferenceStore>,
    identity: Arc<dyn IdentityProvider>,
    diagnostics: Arc<DiagnosticLog>,
    effect: Option<ApplyEffect<T>>,
}

impl<T> PreferenceService<T>
where
    T: Clone + Display + FromStr + Send + Sync,
{
    pub fn new(
        name: impl Into<String>,
        default: T,
        local: Arc<dyn LocalPreferenceStore>,
        remote: Arc<dyn RemotePreferenceStore>,
        identity: Arc<dyn IdentityProvider>,
        diagnostics: Arc<DiagnosticLog>,
    ) -> Self {
        let initial = PreferenceState {
            value: default.clone(),
            source: PreferenceSource::Default,
            phase: SyncPhase::Uninitialized,
            pending: false,
        };
        Self {
            name: name.into(),
            default,
            state: Mutex::new(initial),
            local,
            remote,
            identity,
            diagnostics,
            effect: None,
        }
    }

    /// Attach the side effect applied on every value transition.
    pub fn with_effect(mut self, effect: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.effect = Some(Arc::new(effect));
        self
    }

    /// Adopt the local copy (or the default) so the page can paint
    /// immediately. Synchronous; remote reconciliation follows separately
    /// via [`reconcile`](Self::reconcile).
    pub fn load(&self) {
        let (value, source) = match self.local.get(&self.name).and_then(|raw| raw.parse().ok()) {
            Some(value) => (value, PreferenceSource::Local),
            // Missing or unparseable local copy: fall back to the default.
            None => (self.default.clone(), PreferenceSource::Default),
        };

        {
            let mut state = self.lock();
            state.value = value.clone();
            state.source = source;
            state.phase = SyncPhase::LocalLoaded;
        }
        self.apply(&value);
    }

    /// Ask the remote store for the authoritative value.
    ///
    /// Unidentified sessions skip reconciliation and stay `LocalLoaded`.
    /// A non-null remote value overwrites the current one regardless of
    /// what the local copy held. Remote failure is non-fatal: the session
    /// keeps its current value and the failure goes to the diagnostic log.
    pub async fn reconcile(&self) {
        let Some(identity) = self.identity.current_identity() else {
            debug!(
                "No identity for preference '{}', skipping reconciliation",
                self.name
            );
            return;
        };

        debug!(
            "Reconciling preference '{}' for identity '{}'",
            self.name,
            identity.as_str()
        );
        match self.remote.get(&identity, &self.name).await {
            Ok(Some(raw)) => match raw.parse::<T>() {
                Ok(value) => {
                    {
                        let mut state = self.lock();
                        state.value = value.clone();
                        state.source = PreferenceSource::Remote;
                        state.phase = SyncPhase::Reconciled;
                    }
                    self.apply(&value);
                }
                Err(_) => {
                    warn!(
                        "Remote value for preference '{}' is unparseable, keeping local value",
                        self.name
                    );
                }
            },
            Ok(None) => {
                // The user never set the preference remotely; the current
                // value stands as reconciled.
                let value = {
                    let mut state = self.lock();
                    state.phase = SyncPhase::Reconciled;
                    state.value.clone()
                };
                self.apply(&value);
            }
            Err(e) => {
                warn!(
                    "Remote read failed for preference '{}': {}. Staying on local value.",
                    self.name, e
                );
                self.diagnostics.record(&self.name, &e);
            }
        }
    }

    /// Apply `value` optimistically and persist it.
    ///
    /// The in-memory state and the local copy are written synchronously; the
    /// remote write runs with `pending` raised and is never rolled back. If
    /// that write fails, local state stays the source of truth for the rest
    /// of the session, and the next session's reconcile may revert to the
    /// stale remote value - an accepted trade-off, visible only in the
    /// diagnostic log.
    pub async fn set(&self, value: T) {
        {
            let mut state = self.lock();
            state.value = value.clone();
            state.source = PreferenceSource::Local;
            state.pending = true;
        }
        self.local.set(&self.name, &value.to_string());
        self.apply(&value);

        match self.identity.current_identity() {
            Some(identity) => {
                if let Err(e) = self
                    .remote
                    .upsert(&identity, &self.name, &value.to_string())
                    .await
                {
                    error!(
                        "Remote write failed for preference '{}': {}. Keeping local value.",
                        self.name, e
                    );
                    self.diagnostics.record(&self.name, &e);
                }
            }
            None => {
                debug!(
                    "No identity for preference '{}', remote write skipped",
                    self.name
                );
            }
        }

        self.lock().pending = false;
    }

    /// Current reconciled value.
    pub fn value(&self) -> T {
        self.lock().value.clone()
    }

    /// Snapshot of the full per-preference state.
    pub fn state(&self) -> PreferenceState<T> {
        self.lock().clone()
    }

    fn apply(&self, value: &T) {
        if let Some(effect) = &self.effect {
            effect(value);
        }
    }

    fn lock(&self) -> MutexGuard<'_, PreferenceState<T>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreferenceService<bool> {
    /// Flip the boolean preference, returning the new value.
    pub async fn toggle(&self) -> bool {
        let next = !self.value();
        self.set(next).await;
        next
    }
}
