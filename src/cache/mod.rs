//! Single-flight cache module.
//!
//! Deduplicates and memoizes expensive derived-content computation per
//! logical key: concurrent requesters for the same key share one in-flight
//! computation, and resolved values are held until their TTL lapses.

pub mod single_flight;

pub use single_flight::SingleFlightCache;
