use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Protocol engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Required value of the `jsonrpc` member, echoed on every response
    pub jsonrpc_version: String,
    /// How long a transport without asynchronous completion waits for the result
    pub timeout_ms: u64,
    /// Whether transports should expose the endpoint at all
    pub active: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jsonrpc_version: crate::JSONRPC_VERSION.to_string(),
            timeout_ms: 30_000,
            active: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `TURUL_JSONRPC_VERSION`, `TURUL_JSONRPC_TIMEOUT_MS` and
    /// `TURUL_JSONRPC_ACTIVE`, keeping the default for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jsonrpc_version = std::env::var("TURUL_JSONRPC_VERSION")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.jsonrpc_version);

        let timeout_ms = std::env::var("TURUL_JSONRPC_TIMEOUT_MS")
            .ok()
            .and_then(|s| match s.trim().parse() {
                Ok(timeout) => Some(timeout),
                Err(_) => {
                    warn!("Ignoring invalid TURUL_JSONRPC_TIMEOUT_MS value: {}", s);
                    None
                }
            })
            .unwrap_or(defaults.timeout_ms);

        let active = std::env::var("TURUL_JSONRPC_ACTIVE")
            .map(|s| s.trim().parse().unwrap_or(defaults.active))
            .unwrap_or(defaults.active);

        Self {
            jsonrpc_version,
            timeout_ms,
            active,
        }
    }

    pub fn with_jsonrpc_version(mut self, version: impl Into<String>) -> Self {
        self.jsonrpc_version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.jsonrpc_version, "2.0");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.active);
    }

    #[test]
    fn test_builder_setters() {
        let config = EngineConfig::new()
            .with_jsonrpc_version("3.0")
            .with_timeout(Duration::from_millis(250))
            .with_active(false);
        assert_eq!(config.jsonrpc_version, "3.0");
        assert_eq!(config.timeout_ms, 250);
        assert!(!config.active);
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: EngineConfig = serde_json::from_value(json!({"timeout_ms": 10})).unwrap();
        assert_eq!(config.timeout_ms, 10);
        assert_eq!(config.jsonrpc_version, "2.0");
        assert!(config.active);
    }

    // Single test touching the process environment to avoid cross-test races
    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("TURUL_JSONRPC_VERSION", "2.1");
            std::env::set_var("TURUL_JSONRPC_TIMEOUT_MS", "not-a-number");
            std::env::set_var("TURUL_JSONRPC_ACTIVE", "false");
        }
        let config = EngineConfig::from_env();
        assert_eq!(config.jsonrpc_version, "2.1");
        assert_eq!(config.timeout_ms, 30_000);
        assert!(!config.active);

        unsafe {
            std::env::set_var("TURUL_JSONRPC_TIMEOUT_MS", "1500");
            std::env::remove_var("TURUL_JSONRPC_VERSION");
            std::env::remove_var("TURUL_JSONRPC_ACTIVE");
        }
        let config = EngineConfig::from_env();
        assert_eq!(config, EngineConfig::default().with_timeout(Duration::from_millis(1500)));

        unsafe {
            std::env::remove_var("TURUL_JSONRPC_TIMEOUT_MS");
        }
    }
}
