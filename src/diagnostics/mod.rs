//! Diagnostic log module.
//!
//! The diagnostic log is the terminal sink for contained failures: feed
//! categories that errored, remote preference writes that never landed.
//! Nothing here reaches the page layer; the log exists for operator
//! inspection on demand.
//!
//! - **Models** (`model.rs`) - The immutable [`ErrorRecord`] entry
//! - **Log** (`log.rs`) - The [`DiagnosticLog`] append/list/clear store

pub mod log;
pub mod model;

pub use log::DiagnosticLog;
pub use model::ErrorRecord;
