//! Feed source trait definition.

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::feeds::model::FeedItem;

/// One remote content source.
///
/// Implementations own the wire details (HTTP, CMS client, whatever); the
/// orchestrator only cares that a source can return up to `limit` items for
/// a named category or fail with a [`FetchError`].
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, category: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError>;
}
