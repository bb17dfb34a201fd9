//! Categorized fetch orchestration.
//!
//! Scheduling model is "fire all, await each independently": every requested
//! category starts immediately, no category's success or failure gates
//! another's start or completion, and there is no guaranteed relative order
//! between completions. Failures are contained - recorded to the diagnostic
//! log and surfaced as "no data" for that category only.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::stream::{BoxStream, FuturesUnordered};
use futures::StreamExt;
use log::{debug, info, warn};

use crate::cache::SingleFlightCache;
use crate::diagnostics::DiagnosticLog;
use crate::errors::{ComputeError, Error};
use crate::feeds::model::{CategoryRequest, CategoryState, FeedItem, FetchReport};

struct FeedCache {
    cache: SingleFlightCache<String, Vec<FeedItem>>,
    ttl: Duration,
}

/// One category's shared state plus the token of the invocation that owns
/// its loading flag. Ownership is per category: a later invocation that
/// never requested this category does not claim it, so the in-flight
/// completion still gets to land.
struct CategorySlot {
    state: CategoryState,
    token: u64,
}

impl CategorySlot {
    fn new(name: &str, primary: bool, token: u64) -> Self {
        Self {
            state: CategoryState::new(name, primary),
            token,
        }
    }
}

/// Runs independently-named fetch operations with per-category failure
/// isolation.
///
/// Owns the shared per-category state the page layer polls between
/// completions. In-flight operations are never force-cancelled; a
/// monotonically increasing request token keeps slow stale responses from
/// clobbering the state a newer invocation wrote.
pub struct FeedOrchestrator {
    states: Mutex<HashMap<String, CategorySlot>>,
    diagnostics: Arc<DiagnosticLog>,
    cache: Option<FeedCache>,
    token: AtomicU64,
}

impl FeedOrchestrator {
    pub fn new(diagnostics: Arc<DiagnosticLog>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            diagnostics,
            cache: None,
            token: AtomicU64::new(0),
        }
    }

    /// Route category fetches through a single-flight cache keyed by
    /// `"{name}:{limit}"`, so concurrent renders of the same category share
    /// one fetch within the TTL window.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(FeedCache {
            cache: SingleFlightCache::new(),
            ttl,
        });
        self
    }

    /// Fetch every requested category and await all completions.
    ///
    /// Each category independently flips its loading flag to true, runs its
    /// source operation, and flips the flag back exactly once - on success
    /// with a fresh `last_result`, on failure with the previous one kept
    /// (or `None` on a first attempt) and a diagnostic record under the
    /// category name.
    pub async fn fetch_all(&self, requests: Vec<CategoryRequest>) -> FetchReport {
        let (token, mut completions) = self.begin(requests);

        let mut categories = Vec::with_capacity(completions.len());
        while let Some(state) = completions.next().await {
            categories.push(state);
        }

        FetchReport { token, categories }
    }

    /// Like [`fetch_all`](Self::fetch_all) but yields each category's state
    /// as it completes, in completion order.
    pub fn fetch_stream(&self, requests: Vec<CategoryRequest>) -> BoxStream<'_, CategoryState> {
        let (_token, completions) = self.begin(requests);
        completions.boxed()
    }

    /// The token of the most recent invocation. Snapshots carrying an older
    /// token have been superseded.
    pub fn latest_token(&self) -> u64 {
        self.token.load(Ordering::SeqCst)
    }

    /// Current state of one category, if it was ever requested.
    pub fn category(&self, name: &str) -> Option<CategoryState> {
        self.lock().get(name).map(|slot| slot.state.clone())
    }

    /// Snapshot of every category's current state.
    pub fn categories(&self) -> Vec<CategoryState> {
        self.lock().values().map(|slot| slot.state.clone()).collect()
    }

    /// Take a fresh token, mark every category loading, and fire all
    /// operations.
    fn begin(
        &self,
        requests: Vec<CategoryRequest>,
    ) -> (u64, FuturesUnordered<impl Future<Output = CategoryState> + '_>) {
        let token = self.token.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut states = self.lock();
            for request in &requests {
                let slot = states
                    .entry(request.name.clone())
                    .or_insert_with(|| CategorySlot::new(&request.name, request.primary, token));
                // Claim the category: any older in-flight completion for it
                // is now stale.
                slot.token = token;
                slot.state.loading = true;
                slot.state.primary = request.primary;
            }
        }

        let completions: FuturesUnordered<_> = requests
            .into_iter()
            .map(|request| self.run_category(request, token))
            .collect();

        (token, completions)
    }

    /// Run one category to completion and fold the outcome into the shared
    /// state, unless a newer invocation superseded this one meanwhile.
    async fn run_category(&self, request: CategoryRequest, token: u64) -> CategoryState {
        debug!(
            "Fetching category '{}' (limit {})",
            request.name, request.limit
        );

        let outcome = self.fetch_items(&request).await;

        // The fetch is done; only now touch the shared state. Staleness is
        // per category: this completion is stale only if a newer invocation
        // re-requested the same category and therefore owns its flags. A
        // later invocation for a disjoint category set claims nothing here,
        // and this completion still lands and flips its own flag.
        let mut states = self.lock();
        let slot = states
            .entry(request.name.clone())
            .or_insert_with(|| CategorySlot::new(&request.name, request.primary, token));
        let current = slot.token == token;

        match outcome {
            Ok(items) => {
                if current {
                    info!(
                        "Category '{}' returned {} items",
                        request.name,
                        items.len()
                    );
                    slot.state.last_result = Some(items);
                } else {
                    debug!(
                        "Discarding stale result for category '{}' (token {})",
                        request.name, token
                    );
                }
            }
            Err(e) => {
                warn!(
                    "Category '{}' failed: {}. Serving empty state.",
                    request.name, e
                );
                self.diagnostics.record(&request.name, &e);
            }
        }

        if current {
            slot.state.loading = false;
        }

        slot.state.clone()
    }

    async fn fetch_items(&self, request: &CategoryRequest) -> Result<Vec<FeedItem>, Error> {
        match &self.cache {
            Some(feed_cache) => {
                let key = format!("{}:{}", request.name, request.limit);
                let source = request.source.clone();
                let name = request.name.clone();
                let limit = request.limit;
                feed_cache
                    .cache
                    .get_or_compute(key, Some(feed_cache.ttl), move || async move {
                        source
                            .fetch(&name, limit)
                            .await
                            .map_err(ComputeError::from)
                    })
                    .await
                    .map_err(Error::from)
            }
            None => request
                .source
                .fetch(&request.name, request.limit)
                .await
                .map_err(Error::from),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CategorySlot>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::feeds::traits::FeedSource;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn item(category: &str, index: usize) -> FeedItem {
        FeedItem {
            id: format!("{}-{}", category, index),
            title: format!("{} story {}", category, index),
            url: None,
            topic: Some(category.to_string()),
            published_at: None,
        }
    }

    struct MockSource {
        failing: Vec<&'static str>,
        calls: AtomicUsize,
        tag: &'static str,
    }

    impl MockSource {
        fn new() -> Arc<Self> {
            Self::tagged("")
        }

        fn tagged(tag: &'static str) -> Arc<Self> {
            Arc::new(Self {
                failing: Vec::new(),
                calls: AtomicUsize::new(0),
                tag,
            })
        }

        fn failing_for(categories: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                failing: categories,
                calls: AtomicUsize::new(0),
                tag: "",
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedSource for MockSource {
        async fn fetch(&self, category: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&category) {
                return Err(FetchError::Timeout("timeout".into()));
            }
            Ok((0..limit)
                .map(|i| item(&format!("{}{}", self.tag, category), i))
                .collect())
        }
    }

    /// Source that waits on a gate before answering, for staleness and
    /// ordering tests.
    struct GatedSource {
        gate: Arc<Notify>,
        tag: &'static str,
    }

    #[async_trait]
    impl FeedSource for GatedSource {
        async fn fetch(&self, category: &str, limit: usize) -> Result<Vec<FeedItem>, FetchError> {
            self.gate.notified().await;
            Ok((0..limit)
                .map(|i| item(&format!("{}{}", self.tag, category), i))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_partial_failure_isolates_categories() {
        let diagnostics = Arc::new(DiagnosticLog::new());
        let orchestrator = FeedOrchestrator::new(diagnostics.clone());
        let source = MockSource::failing_for(vec!["funding"]);

        let report = orchestrator
            .fetch_all(vec![
                CategoryRequest::new("latest", source.clone(), 6),
                CategoryRequest::new("funding", source.clone(), 3),
            ])
            .await;

        let latest = report.category("latest").unwrap();
        assert_eq!(latest.last_result.as_ref().unwrap().len(), 6);
        assert!(!latest.loading);

        let funding = report.category("funding").unwrap();
        assert!(funding.last_result.is_none());
        assert!(!funding.loading);

        let records = diagnostics.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "funding");
    }

    #[tokio::test]
    async fn test_all_loading_flags_reach_false_when_everything_fails() {
        let diagnostics = Arc::new(DiagnosticLog::new());
        let orchestrator = FeedOrchestrator::new(diagnostics.clone());
        let source = MockSource::failing_for(vec!["latest", "funding", "ipo"]);

        let report = orchestrator
            .fetch_all(vec![
                CategoryRequest::new("latest", source.clone(), 6),
                CategoryRequest::new("funding", source.clone(), 3),
                CategoryRequest::new("ipo", source.clone(), 3),
            ])
            .await;

        assert_eq!(report.categories.len(), 3);
        for category in &report.categories {
            assert!(!category.loading);
            assert!(category.last_result.is_none());
        }
        assert_eq!(diagnostics.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_result() {
        let diagnostics = Arc::new(DiagnosticLog::new());
        let orchestrator = FeedOrchestrator::new(diagnostics.clone());

        let healthy = MockSource::new();
        orchestrator
            .fetch_all(vec![CategoryRequest::new("funding", healthy, 3)])
            .await;

        let failing = MockSource::failing_for(vec!["funding"]);
        let report = orchestrator
            .fetch_all(vec![CategoryRequest::new("funding", failing, 3)])
            .await;

        // The category degrades to what it last showed, not to empty.
        let funding = report.category("funding").unwrap();
        assert_eq!(funding.last_result.as_ref().unwrap().len(), 3);
        assert!(!funding.loading);
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_yields_in_completion_order() {
        let orchestrator = FeedOrchestrator::new(Arc::new(DiagnosticLog::new()));
        let gate = Arc::new(Notify::new());
        let slow = Arc::new(GatedSource {
            gate: gate.clone(),
            tag: "",
        });
        let fast = MockSource::new();

        let mut completions = orchestrator.fetch_stream(vec![
            CategoryRequest::new("latest", slow, 6),
            CategoryRequest::new("funding", fast, 3),
        ]);

        let first = completions.next().await.unwrap();
        assert_eq!(first.name, "funding");

        gate.notify_one();
        let second = completions.next().await.unwrap();
        assert_eq!(second.name, "latest");
        assert!(completions.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_completion_does_not_clobber_newer_result() {
        let orchestrator = Arc::new(FeedOrchestrator::new(Arc::new(DiagnosticLog::new())));
        let gate = Arc::new(Notify::new());
        let slow = Arc::new(GatedSource {
            gate: gate.clone(),
            tag: "old-",
        });

        let stale_orchestrator = orchestrator.clone();
        let stale = tokio::spawn(async move {
            stale_orchestrator
                .fetch_all(vec![CategoryRequest::new("latest", slow, 6)])
                .await
        });

        // Let the first invocation get in flight, then supersede it.
        while orchestrator.latest_token() == 0 {
            tokio::task::yield_now().await;
        }
        let report = orchestrator
            .fetch_all(vec![CategoryRequest::new(
                "latest",
                MockSource::tagged("new-"),
                6,
            )])
            .await;
        assert_eq!(report.token, orchestrator.latest_token());

        gate.notify_one();
        stale.await.unwrap();

        let latest = orchestrator.category("latest").unwrap();
        let items = latest.last_result.unwrap();
        assert!(items[0].id.starts_with("new-"));
        assert!(!orchestrator.category("latest").unwrap().loading);
    }

    #[tokio::test]
    async fn test_disjoint_supersede_still_completes_unclaimed_category() {
        let orchestrator = Arc::new(FeedOrchestrator::new(Arc::new(DiagnosticLog::new())));
        let gate = Arc::new(Notify::new());
        let slow = Arc::new(GatedSource {
            gate: gate.clone(),
            tag: "",
        });

        let first_orchestrator = orchestrator.clone();
        let first = tokio::spawn(async move {
            first_orchestrator
                .fetch_all(vec![CategoryRequest::new("ipo", slow, 3)])
                .await
        });

        // Supersede with an invocation that never requests "ipo"; the
        // in-flight category stays claimed by the first invocation.
        while orchestrator.latest_token() == 0 {
            tokio::task::yield_now().await;
        }
        orchestrator
            .fetch_all(vec![CategoryRequest::new("latest", MockSource::new(), 6)])
            .await;

        gate.notify_one();
        let report = first.await.unwrap();

        // The unclaimed completion lands: flag flipped, result written.
        let ipo = report.category("ipo").unwrap();
        assert!(!ipo.loading);
        assert_eq!(ipo.last_result.as_ref().unwrap().len(), 3);

        let shared = orchestrator.category("ipo").unwrap();
        assert!(!shared.loading);
        assert_eq!(shared.last_result.unwrap().len(), 3);
        assert!(!orchestrator.category("latest").unwrap().loading);
    }

    #[tokio::test]
    async fn test_primary_category_featured_listing_split() {
        let orchestrator = FeedOrchestrator::new(Arc::new(DiagnosticLog::new()));
        let source = MockSource::new();

        let report = orchestrator
            .fetch_all(vec![
                CategoryRequest::new("latest", source.clone(), 3).as_primary(),
                CategoryRequest::new("funding", source, 3),
            ])
            .await;

        let latest = report.category("latest").unwrap();
        assert_eq!(latest.featured().unwrap().id, "latest-0");
        assert_eq!(latest.listing().len(), 2);
        assert_eq!(latest.listing()[0].id, "latest-1");

        let funding = report.category("funding").unwrap();
        assert!(funding.featured().is_none());
        assert_eq!(funding.listing().len(), 3);
    }

    #[tokio::test]
    async fn test_cache_deduplicates_fetches_within_window() {
        let orchestrator = FeedOrchestrator::new(Arc::new(DiagnosticLog::new()))
            .with_cache(Duration::from_secs(60));
        let source = MockSource::new();

        let requests =
            |source: &Arc<MockSource>| vec![CategoryRequest::new("ai", source.clone(), 4)];

        let first = orchestrator.fetch_all(requests(&source)).await;
        let second = orchestrator.fetch_all(requests(&source)).await;

        assert_eq!(source.call_count(), 1);
        assert_eq!(
            first.category("ai").unwrap().last_result,
            second.category("ai").unwrap().last_result
        );
    }

    #[tokio::test]
    async fn test_cache_failure_is_contained_and_not_memoized() {
        let diagnostics = Arc::new(DiagnosticLog::new());
        let orchestrator =
            FeedOrchestrator::new(diagnostics.clone()).with_cache(Duration::from_secs(60));

        let failing = MockSource::failing_for(vec!["ai"]);
        orchestrator
            .fetch_all(vec![CategoryRequest::new("ai", failing, 4)])
            .await;
        assert_eq!(diagnostics.len(), 1);

        // The failure was not cached, so a healthy source can recover.
        let healthy = MockSource::new();
        let report = orchestrator
            .fetch_all(vec![CategoryRequest::new("ai", healthy.clone(), 4)])
            .await;

        assert_eq!(healthy.call_count(), 1);
        assert_eq!(
            report
                .category("ai")
                .unwrap()
                .last_result
                .as_ref()
                .unwrap()
                .len(),
            4
        );
    }

    #[tokio::test]
    async fn test_category_accessors_expose_shared_state() {
        let orchestrator = FeedOrchestrator::new(Arc::new(DiagnosticLog::new()));
        assert!(orchestrator.category("latest").is_none());

        orchestrator
            .fetch_all(vec![CategoryRequest::new("latest", MockSource::new(), 2)])
            .await;

        let latest = orchestrator.category("latest").unwrap();
        assert!(!latest.loading);
        assert_eq!(latest.last_result.unwrap().len(), 2);
        assert_eq!(orchestrator.categories().len(), 1);
    }
}
