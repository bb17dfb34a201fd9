//! Feed domain models.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feeds::traits::FeedSource;

/// One content item returned by a feed source.
///
/// The business meaning of an item is out of scope here; the resilience
/// layer only moves these around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub topic: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// One named category to fetch in a [`fetch_all`] invocation.
///
/// [`fetch_all`]: crate::feeds::FeedOrchestrator::fetch_all
#[derive(Clone)]
pub struct CategoryRequest {
    pub name: String,
    pub limit: usize,
    /// Primary categories get the featured/listing split applied by
    /// [`CategoryState::featured`] and [`CategoryState::listing`].
    pub primary: bool,
    pub source: Arc<dyn FeedSource>,
}

impl CategoryRequest {
    pub fn new(name: impl Into<String>, source: Arc<dyn FeedSource>, limit: usize) -> Self {
        Self {
            name: name.into(),
            limit,
            primary: false,
            source,
        }
    }

    /// Mark this category as the page's primary one.
    pub fn as_primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Per-category view the page layer reads.
///
/// `last_result` survives a failed refetch: a category that errored keeps
/// whatever it last showed (or stays `None` on a first attempt).
#[derive(Debug, Clone, Serialize)]
pub struct CategoryState {
    pub name: String,
    pub loading: bool,
    pub last_result: Option<Vec<FeedItem>>,
    pub primary: bool,
}

impl CategoryState {
    pub(crate) fn new(name: &str, primary: bool) -> Self {
        Self {
            name: name.to_string(),
            loading: false,
            last_result: None,
            primary,
        }
    }

    /// The featured item of a primary category: its first successfully
    /// returned item. Pure post-processing over the returned sequence.
    pub fn featured(&self) -> Option<&FeedItem> {
        if !self.primary {
            return None;
        }
        self.last_result.as_deref()?.first()
    }

    /// The category's own listing, with the featured item excluded for a
    /// primary category.
    pub fn listing(&self) -> &[FeedItem] {
        let items = self.last_result.as_deref().unwrap_or(&[]);
        if self.primary && !items.is_empty() {
            &items[1..]
        } else {
            items
        }
    }
}

/// Outcome of one `fetch_all` invocation.
///
/// `token` identifies the invocation; callers comparing it against
/// [`latest_token`] can discard snapshots a newer request has superseded.
///
/// [`latest_token`]: crate::feeds::FeedOrchestrator::latest_token
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub token: u64,
    pub categories: Vec<CategoryState>,
}

impl FetchReport {
    pub fn category(&self, name: &str) -> Option<&CategoryState> {
        self.categories.iter().find(|c| c.name == name)
    }
}
