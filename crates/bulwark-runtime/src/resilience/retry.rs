//! Fixed-backoff retry for primary-source calls.

use backon::{ConstantBuilder, Retryable};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use bulwark_core::AccessConfig;

/// Bounded retry with a constant wait between attempts.
///
/// `attempts` counts every call, including the first. The wait runs only
/// between attempts, never after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy. `attempts` below 1 is raised to 1.
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.retry_count, config.retry_backoff)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// Returns the last error on exhaustion. The wait is an async sleep,
    /// so dropping the returned future abandons the sequence.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        op.retry(self.backoff_builder())
            .sleep(tokio::time::sleep)
            .notify(|err: &E, delay: Duration| {
                tracing::debug!(error = %err, delay = ?delay, "Retrying after failure");
            })
            .await
    }

    fn backoff_builder(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.backoff)
            .with_max_times((self.attempts - 1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AccessConfig::default())
    }
}
