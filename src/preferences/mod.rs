//! Preference reconciliation module.
//!
//! A user preference (e.g. the dark-mode flag) lives in two places: an
//! immediately-available local copy and an authoritative remote copy. This
//! module reconciles the two under eventual consistency - local first for a
//! fast paint, remote-wins once an identified session can ask the system of
//! record, optimistic local writes with fire-and-forget remote persistence.
//!
//! - **Models** (`model.rs`) - Reconciliation phases and the per-preference state
//! - **Traits** (`traits.rs`) - Injected local/remote store and identity seams
//! - **Service** (`service.rs`) - The [`PreferenceService`] state machine

pub mod model;
pub mod service;
pub mod traits;

pub use model::{PreferenceSource, PreferenceState, SyncPhase};
pub use service::PreferenceService;
pub use traits::{Identity, IdentityProvider, LocalPreferenceStore, RemotePreferenceStore};
