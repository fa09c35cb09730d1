//! Resilience patterns for bulwark-runtime.
//!
//! This module provides:
//! - Fixed-backoff retry for the primary source
//! - Access counters for cache, primary, and secondary traffic

mod retry;
mod stats;

pub use retry::RetryPolicy;
pub use stats::{AccessStats, AccessStatsSnapshot};
