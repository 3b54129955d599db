//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use fabgate_core::VALID_CODE;

/// Per-peer commit confirmation deadline.
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Deadline for instantiate and upgrade proposals.
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("valid_code must not be empty")]
    EmptyValidCode,
}

/// Configuration for submissions, confirmations and lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// How long each peer's commit confirmation may take.
    pub event_timeout: Duration,
    /// How long a custom chaincode event listener waits after commit.
    pub listener_timeout: Duration,
    /// Deadline passed with instantiate/upgrade proposals.
    pub lifecycle_timeout: Duration,
    /// Validation code the network reports for a committed transaction.
    pub valid_code: String,
    /// Working root for chaincode packaging.
    pub package_dir: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            listener_timeout: DEFAULT_EVENT_TIMEOUT,
            lifecycle_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            valid_code: VALID_CODE.to_string(),
            package_dir: std::env::temp_dir(),
        }
    }
}

/// On-disk shape: timeouts in milliseconds, everything optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    event_timeout_ms: Option<u64>,
    listener_timeout_ms: Option<u64>,
    lifecycle_timeout_ms: Option<u64>,
    valid_code: Option<String>,
    package_dir: Option<PathBuf>,
}

impl GatewayConfig {
    /// Parse a JSON document. Missing fields take their defaults; a missing
    /// listener timeout follows the event timeout.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let defaults = Self::default();

        let event_timeout = raw
            .event_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.event_timeout);
        let config = Self {
            event_timeout,
            listener_timeout: raw
                .listener_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(event_timeout),
            lifecycle_timeout: raw
                .lifecycle_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.lifecycle_timeout),
            valid_code: raw.valid_code.unwrap_or(defaults.valid_code),
            package_dir: raw.package_dir.unwrap_or(defaults.package_dir),
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("event_timeout"));
        }
        if self.listener_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("listener_timeout"));
        }
        if self.lifecycle_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("lifecycle_timeout"));
        }
        if self.valid_code.is_empty() {
            return Err(ConfigError::EmptyValidCode);
        }
        Ok(())
    }

    /// Set the commit deadline. Listeners follow it unless
    /// [`with_listener_timeout`](Self::with_listener_timeout) is called after.
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self.listener_timeout = timeout;
        self
    }

    pub fn with_listener_timeout(mut self, timeout: Duration) -> Self {
        self.listener_timeout = timeout;
        self
    }

    pub fn with_package_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.event_timeout, Duration::from_secs(10));
        assert_eq!(config.lifecycle_timeout, Duration::from_secs(120));
        assert_eq!(config.valid_code, "VALID");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_overrides() {
        let config = GatewayConfig::from_json(
            r#"{"event_timeout_ms": 2500, "valid_code": "OK", "package_dir": "/var/tmp"}"#,
        )
        .unwrap();
        assert_eq!(config.event_timeout, Duration::from_millis(2500));
        assert_eq!(config.listener_timeout, Duration::from_millis(2500));
        assert_eq!(config.lifecycle_timeout, DEFAULT_LIFECYCLE_TIMEOUT);
        assert_eq!(config.valid_code, "OK");
        assert_eq!(config.package_dir, PathBuf::from("/var/tmp"));
    }

    #[test]
    fn test_event_timeout_builder_carries_listener_timeout() {
        let config = GatewayConfig::default().with_event_timeout(Duration::from_secs(1));
        assert_eq!(config.listener_timeout, Duration::from_secs(1));
        assert_eq!(
            config,
            GatewayConfig::from_json(r#"{"event_timeout_ms": 1000}"#).unwrap()
        );

        let config = config.with_listener_timeout(Duration::from_millis(250));
        assert_eq!(config.event_timeout, Duration::from_secs(1));
        assert_eq!(config.listener_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_json_rejects_zero_timeout() {
        let err = GatewayConfig::from_json(r#"{"lifecycle_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout("lifecycle_timeout")));
    }

    #[test]
    fn test_from_json_rejects_unknown_field() {
        assert!(matches!(
            GatewayConfig::from_json(r#"{"evnt_timeout_ms": 5}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, r#"{"event_timeout_ms": 100}"#).unwrap();
        let config = GatewayConfig::from_file(&path).unwrap();
        assert_eq!(config.event_timeout, Duration::from_millis(100));
    }
}
