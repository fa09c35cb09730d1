//! Access layer configuration from YAML/JSON.
//!
//! Every field has a default, so an empty document is a valid
//! configuration. Durations are written in humantime form (`"1s"`,
//! `"5m"`, `"1h"`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `retry_count`.
pub const RETRY_COUNT_ENV: &str = "BULWARK_RETRY_COUNT";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// How the error window bounds its event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Keep at most `capacity` events; older ones are forgotten even if
    /// they still fall inside the window.
    Bounded { capacity: usize },

    /// Keep every event until it ages out of the window.
    AgeOnly,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::Bounded { capacity: 20 }
    }
}

/// Error window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Trailing interval in which failures count against the primary
    #[serde(with = "duration_str")]
    pub length: Duration,

    /// Event log bound
    pub policy: WindowPolicy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            length: Duration::from_secs(60 * 60),
            policy: WindowPolicy::default(),
        }
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live applied to every cached item
    #[serde(with = "duration_str")]
    pub ttl: Duration,

    /// Upper bound on cached items
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_entries: 10_000,
        }
    }
}

/// Configuration consumed by the fallback orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Attempts against the primary source per lookup (>= 1)
    pub retry_count: u32,

    /// Fixed wait between primary attempts
    #[serde(with = "duration_str")]
    pub retry_backoff: Duration,

    /// Recent failures at which the primary is skipped entirely
    pub failure_threshold: usize,

    pub window: WindowConfig,

    pub cache: CacheConfig,

    /// Overall deadline for a single lookup, if any
    #[serde(with = "opt_duration_str", skip_serializing_if = "Option::is_none")]
    pub lookup_deadline: Option<Duration>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_backoff: Duration::from_secs(1),
            failure_threshold: 10,
            window: WindowConfig::default(),
            cache: CacheConfig::default(),
            lookup_deadline: None,
        }
    }
}

impl AccessConfig {
    /// Parse a config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: AccessConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AccessConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            Some("json") => Self::from_json(&contents),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(RETRY_COUNT_ENV) {
            self.retry_count = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: RETRY_COUNT_ENV.to_string(),
                value: value.clone(),
            })?;
            tracing::debug!(retry_count = self.retry_count, "retry_count overridden from environment");
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_count == 0 {
            return Err(ConfigError::ValidationError(
                "retry_count must be at least 1".to_string(),
            ));
        }

        if self.failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "failure_threshold must be at least 1".to_string(),
            ));
        }

        if self.window.length.is_zero() {
            return Err(ConfigError::ValidationError(
                "window.length must be positive".to_string(),
            ));
        }

        if let WindowPolicy::Bounded { capacity } = self.window.policy {
            if capacity == 0 {
                return Err(ConfigError::ValidationError(
                    "window.policy.capacity must be at least 1".to_string(),
                ));
            }
        }

        if self.cache.ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "cache.ttl must be positive".to_string(),
            ));
        }

        if self.lookup_deadline.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ValidationError(
                "lookup_deadline must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod opt_duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.retry_backoff, Duration::from_secs(1));
        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.window.length, Duration::from_secs(3600));
        assert_eq!(config.window.policy, WindowPolicy::Bounded { capacity: 20 });
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert!(config.lookup_deadline.is_none());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = AccessConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AccessConfig::default());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
retry_count: 5
retry_backoff: "250ms"
failure_threshold: 4
window:
  length: "30m"
  policy:
    type: age_only
cache:
  ttl: "2m"
  max_entries: 64
lookup_deadline: "10s"
"#;
        let config = AccessConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.retry_backoff, Duration::from_millis(250));
        assert_eq!(config.failure_threshold, 4);
        assert_eq!(config.window.length, Duration::from_secs(1800));
        assert_eq!(config.window.policy, WindowPolicy::AgeOnly);
        assert_eq!(config.cache.ttl, Duration::from_secs(120));
        assert_eq!(config.cache.max_entries, 64);
        assert_eq!(config.lookup_deadline, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_parse_json_bounded_policy() {
        let json = r#"{"window": {"policy": {"type": "bounded", "capacity": 50}}}"#;
        let config = AccessConfig::from_json(json).unwrap();
        assert_eq!(config.window.policy, WindowPolicy::Bounded { capacity: 50 });
        assert_eq!(config.window.length, Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_retry_count_rejected() {
        let result = AccessConfig::from_yaml("retry_count: 0");
        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("retry_count")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = AccessConfig::from_yaml("retry_backoff: soon");
        assert!(matches!(result, Err(ConfigError::YamlError(_))));
    }

    #[test]
    fn test_env_override() {
        let config = AccessConfig::default()
            .with_overrides(|var| (var == RETRY_COUNT_ENV).then(|| "7".to_string()))
            .unwrap();
        assert_eq!(config.retry_count, 7);
    }

    #[test]
    fn test_env_override_invalid() {
        let result = AccessConfig::default().with_overrides(|_| Some("lots".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));

        let result = AccessConfig::default().with_overrides(|_| Some("0".to_string()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_yaml_serialization_uses_humantime() {
        let yaml = serde_yaml::to_string(&AccessConfig::default()).unwrap();
        assert!(yaml.contains("retry_backoff: 1s"));
        assert!(yaml.contains("ttl: 5m"));
        assert!(!yaml.contains("lookup_deadline"));

        let parsed = AccessConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, AccessConfig::default());
    }
}
