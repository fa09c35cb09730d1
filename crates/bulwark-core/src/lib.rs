//! # bulwark-core
//!
//! Synchronous building blocks for the Bulwark access layer.
//!
//! This crate holds the parts of the access layer that need no async
//! runtime:
//! - [`ErrorWindow`]: a bounded log of primary-source failures that
//!   answers "how many failures in the last hour?"
//! - [`AccessConfig`]: the configuration surface consumed by the
//!   orchestrator in `bulwark-runtime`
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Instant;
//! use bulwark_core::{AccessConfig, ErrorWindow};
//!
//! let config = AccessConfig::from_file("bulwark.yaml")?;
//! let window = ErrorWindow::new(config.window.clone());
//!
//! window.record_failure(Instant::now());
//! let health = window.health(Instant::now(), config.failure_threshold);
//! assert!(!health.is_degraded());
//! ```

pub mod config;
pub mod window;

pub use config::{
    AccessConfig, CacheConfig, ConfigError, WindowConfig, WindowPolicy, RETRY_COUNT_ENV,
};
pub use window::{ErrorWindow, HealthState};
