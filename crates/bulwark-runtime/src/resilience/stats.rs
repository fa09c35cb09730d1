//! Access counters for the fallback orchestrator.
//!
//! Counters are plain atomics so every lookup can update them without
//! taking a lock.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by all lookups.
#[derive(Debug, Default)]
pub struct AccessStats {
    lookups: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    primary_attempts: AtomicU64,
    primary_failures: AtomicU64,
    circuit_open: AtomicU64,
    secondary_lookups: AtomicU64,
    not_found: AtomicU64,
}

/// Point-in-time copy of [`AccessStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessStatsSnapshot {
    /// Calls to `get`
    pub lookups: u64,

    /// Lookups answered from the cache
    pub cache_hits: u64,

    pub cache_misses: u64,

    /// Calls made to the primary source
    pub primary_attempts: u64,

    /// Primary calls that failed
    pub primary_failures: u64,

    /// Lookups routed straight to the secondary because the primary was degraded
    pub circuit_open: u64,

    /// Calls made to the secondary source
    pub secondary_lookups: u64,

    /// Resolutions that found nothing in either source
    pub not_found: u64,
}

impl AccessStatsSnapshot {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.lookups as f64
        }
    }
}

impl AccessStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_primary_attempt(&self) {
        self.primary_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_primary_failure(&self) {
        self.primary_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_circuit_open(&self) {
        self.circuit_open.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_secondary_lookup(&self) {
        self.secondary_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current counters.
    pub fn snapshot(&self) -> AccessStatsSnapshot {
        AccessStatsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            primary_attempts: self.primary_attempts.load(Ordering::Relaxed),
            primary_failures: self.primary_failures.load(Ordering::Relaxed),
            circuit_open: self.circuit_open.load(Ordering::Relaxed),
            secondary_lookups: self.secondary_lookups.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.lookups,
            &self.cache_hits,
            &self.cache_misses,
            &self.primary_attempts,
            &self.primary_failures,
            &self.circuit_open,
            &self.secondary_lookups,
            &self.not_found,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
