use crate::addressing::LinearAddressing;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and synchronization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lighting server host
    pub host: String,
    pub port: u16,
    /// WebSocket path on the server
    pub path: String,
    /// Use `wss://` instead of `ws://`
    pub secure: bool,
    pub heartbeat_interval_ms: u64,
    /// Quiet window for coalescing inbound channel levels
    pub aggregation_window_ms: u64,
    pub universe_size: u32,
    pub first_universe: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            path: "/lighting/".to_string(),
            secure: false,
            heartbeat_interval_ms: 10_000,
            aggregation_window_ms: 10,
            universe_size: 512,
            first_universe: 1,
        }
    }
}

impl SyncConfig {
    /// Config for a server at `host:port` with every other setting defaulted
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let config: SyncConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no connection could work with
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SyncError::Config("host must not be empty".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(SyncError::Config(format!(
                "path must start with '/', got {:?}",
                self.path
            )));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(SyncError::Config(
                "heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.universe_size == 0 {
            return Err(SyncError::Config(
                "universe_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// WebSocket URL of the lighting endpoint
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn aggregation_window(&self) -> Duration {
        Duration::from_millis(self.aggregation_window_ms)
    }

    pub fn addressing(&self) -> LinearAddressing {
        LinearAddressing::new(self.universe_size, self.first_universe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_lighting_endpoint() {
        let config = SyncConfig::default();
        assert_eq!(config.endpoint_url(), "ws://localhost:8080/lighting/");
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SyncConfig::from_json(r#"{"host": "10.0.0.5", "secure": true, "port": 443}"#).unwrap();
        assert_eq!(config.endpoint_url(), "wss://10.0.0.5:443/lighting/");
        assert_eq!(config.aggregation_window_ms, 10);
        assert_eq!(config.addressing(), LinearAddressing::new(512, 1));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(matches!(
            SyncConfig::from_json(r#"{"heartbeat_interval_ms": 0}"#),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            SyncConfig::from_json(r#"{"path": "lighting"}"#),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            SyncConfig::from_json(r#"{"universe_size": 0}"#),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(SyncConfig::from_json("[1, 2]"), Err(SyncError::Json(_))));
    }
}
