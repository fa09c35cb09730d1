//! Fallback orchestrator for item lookups.
//!
//! The orchestrator answers "get item by id" in this order:
//! 1. Cache: a live entry is returned without touching anything else
//! 2. Health check: count recent primary failures in the error window
//! 3. Route: below the threshold try the primary with retries, at or
//!    above it go straight to the secondary (circuit open)
//! 4. If the primary exhausts its attempts, consult the secondary for the
//!    same lookup
//!
//! A found item is cached with the configured TTL; "not found" is not.
//! Concurrent lookups of the same id share one resolution, while
//! lookups of different ids never wait on each other.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use bulwark_core::{AccessConfig, ConfigError, ErrorWindow, HealthState};

use crate::cache::ItemCache;
use crate::resilience::{AccessStats, AccessStatsSnapshot, RetryPolicy};
use crate::sources::{PrimarySource, SecondarySource, SourceError};

/// Errors surfaced by a lookup.
///
/// Primary failures never appear here; they are retried and then fed
/// into the health decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Secondary source failed: {0}")]
    Secondary(#[source] SourceError),

    #[error("Lookup exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Lookup cancelled")]
    Cancelled,
}

/// Errors from building an orchestrator.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{0} source not configured")]
    MissingSource(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Stage of a resolution after a cache miss. Stages only move forward.
enum Stage<T> {
    HealthCheck,
    PrimaryPath,
    SecondaryPath,
    Done(Option<T>),
}

/// Cache-fronted lookup over a primary and a secondary source.
///
/// # Architecture
/// - Cache: moka with a single TTL, doubling as the per-id single-flight
/// - Circuit breaker: error window count against `failure_threshold`
/// - Retry: fixed backoff against the primary, `retry_count` attempts
/// - Fallback: secondary after circuit open or exhausted retries
pub struct FallbackOrchestrator<T> {
    primary: Arc<dyn PrimarySource<T>>,
    secondary: Arc<dyn SecondarySource<T>>,
    cache: ItemCache<T>,
    window: ErrorWindow,
    retry: RetryPolicy,
    failure_threshold: usize,
    lookup_deadline: Option<Duration>,
    stats: AccessStats,
}

impl<T> FallbackOrchestrator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new orchestrator.
    pub fn new(
        primary: Arc<dyn PrimarySource<T>>,
        secondary: Arc<dyn SecondarySource<T>>,
        config: AccessConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        tracing::info!(
            primary = primary.name(),
            secondary = secondary.name(),
            retry_count = config.retry_count,
            failure_threshold = config.failure_threshold,
            cache_ttl = ?config.cache.ttl,
            "Fallback orchestrator ready"
        );

        Ok(Self {
            primary,
            secondary,
            cache: ItemCache::new(&config.cache),
            window: ErrorWindow::new(config.window.clone()),
            retry: RetryPolicy::from_config(&config),
            failure_threshold: config.failure_threshold,
            lookup_deadline: config.lookup_deadline,
            stats: AccessStats::new(),
        })
    }

    pub fn builder() -> FallbackOrchestratorBuilder<T> {
        FallbackOrchestratorBuilder::new()
    }

    /// Look up an item.
    ///
    /// Returns `Ok(None)` when neither source has it. Applies the
    /// configured lookup deadline, if any.
    pub async fn get(&self, id: &str) -> Result<Option<T>, AccessError> {
        match self.lookup_deadline {
            Some(deadline) => self.get_with_deadline(id, deadline).await,
            None => self.lookup(id).await,
        }
    }

    /// Look up an item, giving up after `deadline`.
    pub async fn get_with_deadline(
        &self,
        id: &str,
        deadline: Duration,
    ) -> Result<Option<T>, AccessError> {
        match tokio::time::timeout(deadline, self.lookup(id)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(id = %id, deadline = ?deadline, "Lookup exceeded deadline");
                Err(AccessError::DeadlineExceeded(deadline))
            }
        }
    }

    /// Look up an item, abandoning it when `token` is cancelled.
    pub async fn get_cancellable(
        &self,
        id: &str,
        token: &CancellationToken,
    ) -> Result<Option<T>, AccessError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(id = %id, "Lookup cancelled by caller");
                Err(AccessError::Cancelled)
            }
            result = self.get(id) => result,
        }
    }

    async fn lookup(&self, id: &str) -> Result<Option<T>, AccessError> {
        self.stats.record_lookup();

        if let Some(item) = self.cache.get(id).await {
            self.stats.record_cache_hit();
            tracing::debug!(id = %id, "Cache hit");
            return Ok(Some(item));
        }

        self.stats.record_cache_miss();
        tracing::debug!(id = %id, "Cache miss");

        // Waiters on the same id share this resolution and its result.
        self.cache.get_or_load(id, self.resolve(id)).await
    }

    /// Decide on a source and fetch, once per cache miss.
    async fn resolve(&self, id: &str) -> Result<Option<T>, AccessError> {
        let mut stage = Stage::HealthCheck;

        loop {
            stage = match stage {
                Stage::HealthCheck => {
                    let health = self.health();
                    if health.is_degraded() {
                        self.stats.record_circuit_open();
                        tracing::warn!(
                            id = %id,
                            recent_failures = health.recent_failures,
                            threshold = health.threshold,
                            "Primary degraded, routing to secondary"
                        );
                        Stage::SecondaryPath
                    } else {
                        Stage::PrimaryPath
                    }
                }
                Stage::PrimaryPath => match self.fetch_primary(id).await {
                    Some(item) => Stage::Done(Some(item)),
                    None => {
                        tracing::info!(
                            id = %id,
                            attempts = self.retry.attempts(),
                            "Primary attempts exhausted, falling back to secondary"
                        );
                        Stage::SecondaryPath
                    }
                },
                Stage::SecondaryPath => Stage::Done(self.fetch_secondary(id).await?),
                Stage::Done(item) => {
                    if item.is_none() {
                        self.stats.record_not_found();
                        tracing::debug!(id = %id, "Item not found in any source");
                    }
                    return Ok(item);
                }
            };
        }
    }

    async fn fetch_primary(&self, id: &str) -> Option<T> {
        let primary = &self.primary;
        let window = &self.window;
        let stats = &self.stats;
        let mut attempt = 0u32;

        let op = move || {
            attempt += 1;
            async move {
                stats.record_primary_attempt();
                primary.fetch(id).await.map_err(|e| {
                    window.record_failure(now());
                    stats.record_primary_failure();
                    tracing::warn!(
                        id = %id,
                        source = primary.name(),
                        attempt,
                        error = %e,
                        "Primary fetch failed"
                    );
                    e
                })
            }
        };

        self.retry.run(op).await.ok()
    }

    async fn fetch_secondary(&self, id: &str) -> Result<Option<T>, AccessError> {
        self.stats.record_secondary_lookup();

        self.secondary.fetch(id).await.map_err(|e| {
            tracing::error!(
                id = %id,
                source = self.secondary.name(),
                error = %e,
                "Secondary fetch failed"
            );
            AccessError::Secondary(e)
        })
    }

    /// Current health of the primary source.
    pub fn health(&self) -> HealthState {
        self.window.health(now(), self.failure_threshold)
    }

    pub fn cache(&self) -> &ItemCache<T> {
        &self.cache
    }

    pub fn error_window(&self) -> &ErrorWindow {
        &self.window
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Get access counters.
    pub fn stats(&self) -> AccessStatsSnapshot {
        self.stats.snapshot()
    }

    /// Reset access counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

/// Failure timestamps follow the tokio clock so paused-time tests line up.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Builder for FallbackOrchestrator.
pub struct FallbackOrchestratorBuilder<T> {
    primary: Option<Arc<dyn PrimarySource<T>>>,
    secondary: Option<Arc<dyn SecondarySource<T>>>,
    config: AccessConfig,
}

impl<T> FallbackOrchestratorBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            primary: None,
            secondary: None,
            config: AccessConfig::default(),
        }
    }

    /// Set the primary source.
    pub fn primary(mut self, source: Arc<dyn PrimarySource<T>>) -> Self {
        self.primary = Some(source);
        self
    }

    /// Set the secondary source.
    pub fn secondary(mut self, source: Arc<dyn SecondarySource<T>>) -> Self {
        self.secondary = Some(source);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the number of primary attempts.
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.config.retry_count = retry_count;
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<FallbackOrchestrator<T>, BuildError> {
        let primary = self.primary.ok_or(BuildError::MissingSource("primary"))?;
        let secondary = self.secondary.ok_or(BuildError::MissingSource("secondary"))?;

        Ok(FallbackOrchestrator::new(primary, secondary, self.config)?)
    }
}

impl<T> Default for FallbackOrchestratorBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
