//! Categorized feed fetching module.
//!
//! A page asks for several named content categories at once (latest,
//! funding, ipo, resource-by-topic, ...). Each category is an independent
//! unit of work: they all start immediately, complete in whatever order the
//! sources answer, and a failing category degrades to "no data" instead of
//! aborting the page.
//!
//! - **Models** (`model.rs`) - [`FeedItem`], [`CategoryRequest`], [`CategoryState`]
//! - **Traits** (`traits.rs`) - The injected [`FeedSource`] seam
//! - **Orchestrator** (`orchestrator.rs`) - The [`FeedOrchestrator`] service

pub mod model;
pub mod orchestrator;
pub mod traits;

pub use model::{CategoryRequest, CategoryState, FeedItem, FetchReport};
pub use orchestrator::FeedOrchestrator;
pub use traits::FeedSource;
