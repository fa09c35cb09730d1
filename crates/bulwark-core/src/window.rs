//! Sliding window over primary-source failures.
//!
//! The window is a log of failure timestamps, oldest first. Under the
//! default [`WindowPolicy::Bounded`] policy it holds at most `capacity`
//! events, so a burst of failures pushes older events out even when they
//! are still inside the window. The count is an approximation of the
//! true failure rate, never an overcount.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::{WindowConfig, WindowPolicy};

/// Health of the primary source, derived from the window on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthState {
    /// Failures counted inside the trailing window
    pub recent_failures: usize,

    /// Count at which the primary is considered degraded
    pub threshold: usize,
}

impl HealthState {
    /// Whether the primary should be skipped.
    pub fn is_degraded(&self) -> bool {
        self.recent_failures >= self.threshold
    }
}

/// Failure log shared by all lookups.
pub struct ErrorWindow {
    events: Mutex<VecDeque<Instant>>,
    length: Duration,
    policy: WindowPolicy,
}

impl ErrorWindow {
    /// Create an empty window.
    pub fn new(config: WindowConfig) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            length: config.length,
            policy: config.policy,
        }
    }

    /// Record a failure observed at `at`.
    pub fn record_failure(&self, at: Instant) {
        let mut events = self.events.lock();
        events.push_back(at);
        self.prune(&mut events, at);
    }

    /// Count failures strictly newer than `now - length`.
    ///
    /// The log is pruned before counting regardless of event age.
    pub fn count_recent_failures(&self, now: Instant) -> usize {
        let mut events = self.events.lock();
        self.prune(&mut events, now);
        events
            .iter()
            .filter(|at| now.saturating_duration_since(**at) < self.length)
            .count()
    }

    /// Derive the health state at `now` for the given threshold.
    pub fn health(&self, now: Instant, threshold: usize) -> HealthState {
        HealthState {
            recent_failures: self.count_recent_failures(now),
            threshold,
        }
    }

    /// Number of events currently held, regardless of age.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget every recorded failure.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn prune(&self, events: &mut VecDeque<Instant>, now: Instant) {
        match self.policy {
            WindowPolicy::Bounded { capacity } => {
                while events.len() > capacity {
                    events.pop_front();
                }
            }
            WindowPolicy::AgeOnly => {
                while events
                    .front()
                    .is_some_and(|at| now.saturating_duration_since(*at) >= self.length)
                {
                    events.pop_front();
                }
            }
        }
    }
}

impl Default for ErrorWindow {
    fn default() -> Self {
        Self::new(WindowConfig::default())
    }
}

impl std::fmt::Debug for ErrorWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorWindow")
            .field("events", &self.len())
            .field("length", &self.length)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_window_starts_empty() {
        let window = ErrorWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.count_recent_failures(Instant::now()), 0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let window = ErrorWindow::default();
        let now = Instant::now();

        for _ in 0..25 {
            window.record_failure(now);
        }

        assert_eq!(window.len(), 20);
        assert_eq!(window.count_recent_failures(now), 20);
    }

    #[test]
    fn test_oldest_events_are_unrecoverable() {
        let window = ErrorWindow::default();
        let start = Instant::now();

        for i in 0..25u64 {
            window.record_failure(start + Duration::from_secs(i));
        }

        // All 25 are inside the hour, but only the newest 20 are held.
        assert_eq!(window.count_recent_failures(start + MINUTE), 20);

        // Once the 6th failure ages out, exactly one fewer is counted.
        let now = start + Duration::from_secs(5) + 60 * MINUTE;
        assert_eq!(window.count_recent_failures(now), 19);
    }

    #[test]
    fn test_event_ages_out() {
        let window = ErrorWindow::default();
        let t = Instant::now();
        window.record_failure(t);

        assert_eq!(window.count_recent_failures(t + 59 * MINUTE), 1);
        assert_eq!(window.count_recent_failures(t + 61 * MINUTE), 0);
    }

    #[test]
    fn test_bounded_keeps_aged_events_in_log() {
        let window = ErrorWindow::default();
        let t = Instant::now();
        window.record_failure(t);

        assert_eq!(window.count_recent_failures(t + 2 * 60 * MINUTE), 0);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_age_only_policy_counts_past_capacity() {
        let window = ErrorWindow::new(WindowConfig {
            policy: WindowPolicy::AgeOnly,
            ..Default::default()
        });
        let now = Instant::now();

        for _ in 0..25 {
            window.record_failure(now);
        }

        assert_eq!(window.count_recent_failures(now), 25);
    }

    #[test]
    fn test_age_only_policy_prunes_by_age() {
        let window = ErrorWindow::new(WindowConfig {
            policy: WindowPolicy::AgeOnly,
            ..Default::default()
        });
        let t = Instant::now();

        window.record_failure(t);
        window.record_failure(t + 30 * MINUTE);

        assert_eq!(window.count_recent_failures(t + 61 * MINUTE), 1);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_health_threshold_boundary() {
        let window = ErrorWindow::default();
        let now = Instant::now();

        for _ in 0..9 {
            window.record_failure(now);
        }
        assert!(!window.health(now, 10).is_degraded());

        window.record_failure(now);
        let health = window.health(now, 10);
        assert_eq!(health.recent_failures, 10);
        assert!(health.is_degraded());
    }

    #[test]
    fn test_clear() {
        let window = ErrorWindow::default();
        window.record_failure(Instant::now());
        window.clear();
        assert!(window.is_empty());
    }

    proptest! {
        #[test]
        fn prop_count_never_exceeds_capacity(
            offsets in proptest::collection::vec(0u64..7200, 0..60),
            capacity in 1usize..30,
        ) {
            let window = ErrorWindow::new(WindowConfig {
                policy: WindowPolicy::Bounded { capacity },
                ..Default::default()
            });
            let start = Instant::now();

            for offset in &offsets {
                window.record_failure(start + Duration::from_secs(*offset));
            }

            let now = start + Duration::from_secs(7200);
            let count = window.count_recent_failures(now);
            prop_assert!(count <= capacity.min(offsets.len()));
            prop_assert!(window.len() <= capacity);
        }
    }
}
