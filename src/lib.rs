//! Newswire Core - the client-side resilience layer for the Newswire site.
//!
//! This crate contains the coordination logic the page layer leans on:
//! categorized feed fetching with per-category failure isolation, a
//! process-wide diagnostic log for contained failures, a single-flight
//! cache for expensive derived content, and local/remote preference
//! reconciliation. Rendering, routing, and storage live elsewhere and are
//! consumed through the traits defined here.

pub mod cache;
pub mod diagnostics;
pub mod errors;
pub mod feeds;
pub mod preferences;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
