//! # bulwark-runtime
//!
//! Cache-fronted, health-aware item lookup over two data sources.
//!
//! Lookups go through a [`FallbackOrchestrator`]:
//! - live cache entries are returned immediately
//! - otherwise the primary source is tried with bounded retries, unless
//!   recent failures have pushed it past the threshold
//! - the secondary source answers when the primary is skipped or
//!   exhausted
//!
//! Source internals are out of scope; implement [`PrimarySource`] and
//! [`SecondarySource`] for your backends, or use [`CatalogSource`] for
//! in-memory and file-backed data.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bulwark_runtime::{AccessConfig, CatalogSource, FallbackOrchestrator};
//!
//! let config = AccessConfig::from_file("bulwark.yaml")?.with_env_overrides()?;
//! let orchestrator = FallbackOrchestrator::builder()
//!     .primary(Arc::new(remote_catalog))
//!     .secondary(Arc::new(CatalogSource::from_file("sql", "items.yaml")?))
//!     .config(config)
//!     .build()?;
//!
//! match orchestrator.get("ad-1").await? {
//!     Some(item) => println!("found: {:?}", item),
//!     None => println!("not found"),
//! }
//! ```

pub mod cache;
pub mod orchestrator;
pub mod resilience;
pub mod sources;

pub use bulwark_core::{
    AccessConfig, CacheConfig, ConfigError, ErrorWindow, HealthState, WindowConfig, WindowPolicy,
};
pub use cache::ItemCache;
pub use orchestrator::{AccessError, BuildError, FallbackOrchestrator, FallbackOrchestratorBuilder};
pub use resilience::{AccessStats, AccessStatsSnapshot, RetryPolicy};
pub use sources::{CatalogSource, PrimarySource, SecondarySource, SourceError};
pub use tokio_util::sync::CancellationToken;
