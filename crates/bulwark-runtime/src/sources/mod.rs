//! Data source abstractions for bulwark-runtime.
//!
//! The orchestrator talks to two kinds of source:
//! - a [`PrimarySource`]: remote and failure-prone; every error is treated
//!   as transient and retried
//! - a [`SecondarySource`]: durable and authoritative; called once, and a
//!   `None` from it is a legitimate "not found"
//!
//! How either source stores or computes its items is up to the
//! implementation.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod catalog;

pub use catalog::CatalogSource;

/// Errors from data sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Remote error: {status} - {message}")]
    Remote { status: u16, message: String },

    #[error("Failed to decode item: {0}")]
    Decode(String),

    #[error("Failed to load catalog: {0}")]
    Load(String),
}

/// The preferred, failure-prone source.
#[async_trait]
pub trait PrimarySource<T>: Send + Sync {
    /// Fetch the item for `id`.
    ///
    /// Any error is transient from the caller's point of view.
    async fn fetch(&self, id: &str) -> Result<T, SourceError>;

    /// Get source name for logs.
    fn name(&self) -> &str {
        "primary"
    }
}

/// The reliable fallback source.
#[async_trait]
pub trait SecondarySource<T>: Send + Sync {
    /// Fetch the item for `id`, or `None` when it does not exist.
    async fn fetch(&self, id: &str) -> Result<Option<T>, SourceError>;

    /// Get source name for logs.
    fn name(&self) -> &str {
        "secondary"
    }
}
