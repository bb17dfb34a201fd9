//! Injected collaborator seams for preference reconciliation.

use async_trait::async_trait;

use crate::errors::StoreError;

/// Identity of the current user, gating remote reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Synchronous best-effort platform storage for the local copy.
///
/// Never fails by contract; a platform that cannot persist simply returns
/// `None` on the next read.
pub trait LocalPreferenceStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    fn set(&self, name: &str, value: &str);
}

/// The authoritative remote preference store (system of record).
///
/// Keyed by identity + preference name. Values cross this boundary as
/// strings; the service parses at the edges.
#[async_trait]
pub trait RemotePreferenceStore: Send + Sync {
    /// Fetch the stored value, `None` when the user never set one.
    async fn get(&self, identity: &Identity, name: &str)
        -> Result<Option<String>, StoreError>;

    /// Insert or overwrite the stored value.
    async fn upsert(
        &self,
        identity: &Identity,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError>;
}

/// Supplies the current session's identity, if any.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
}
