//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::listen::ListenConfig;

/// Environment variable that overrides the listen port.
pub const PORT_ENV: &str = "PORT";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid PORT value: {0:?}")]
    InvalidPort(String),
}

/// Server configuration.
///
/// Every section is optional; an empty file (or no file at all) yields a
/// relay listening on `0.0.0.0:3000`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server identity and metrics.
    #[serde(default)]
    pub server: ServerConfig,
    /// WebSocket listener configuration.
    #[serde(default)]
    pub listen: ListenConfig,
    /// Queue and frame limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Relay policy.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Optional ping/pong keepalive.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply the `PORT` environment override, if set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        match std::env::var(PORT_ENV) {
            Ok(value) => self.override_port(&value),
            Err(_) => Ok(()),
        }
    }

    fn override_port(&mut self, value: &str) -> Result<(), ConfigError> {
        let port: u16 = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort(value.to_string()))?;
        self.listen.address.set_port(port);
        Ok(())
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in logs.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port. Absent or 0 disables the endpoint.
    #[serde(default)]
    pub metrics_port: Option<u16>,
    /// Log line format on stdout (default: text).
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: None,
            log_format: LogFormat::default(),
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event, for log shippers.
    Json,
}

fn default_server_name() -> String {
    "duet".to_string()
}

/// Relay policy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    /// Drop MIDI from connections that have not sent `join` (default: false).
    ///
    /// When false, MIDI from an unidentified connection is relayed without
    /// a username.
    #[serde(default)]
    pub require_join: bool,
}

/// Keepalive configuration.
///
/// - `ping_interval`: Seconds between WebSocket pings. 0 disables keepalive (default).
/// - `timeout`: Extra seconds of silence tolerated after a ping before disconnect (default: 30).
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: 0,
            timeout: default_heartbeat_timeout(),
        }
    }
}

impl HeartbeatConfig {
    /// Ping interval and idle cutoff, or `None` when keepalive is disabled.
    pub fn schedule(&self) -> Option<(Duration, Duration)> {
        if self.ping_interval == 0 {
            return None;
        }
        let interval = Duration::from_secs(self.ping_interval);
        Some((interval, interval + Duration::from_secs(self.timeout)))
    }
}

fn default_heartbeat_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.name, "duet");
        assert_eq!(config.server.metrics_port, None);
        assert_eq!(config.server.log_format, LogFormat::Text);
        assert_eq!(config.listen.address.port(), 3000);
        assert!(!config.relay.require_join);
        assert!(config.heartbeat.schedule().is_none());
    }

    #[test]
    fn full_config_parses() {
        let toml_str = r#"
            [server]
            name = "studio"
            metrics_port = 9300
            log_format = "json"

            [listen]
            address = "127.0.0.1:8080"
            allow_origins = ["http://localhost:5173"]

            [limits]
            outbound_queue = 32

            [relay]
            require_join = true

            [heartbeat]
            ping_interval = 20
            timeout = 10
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.name, "studio");
        assert_eq!(config.server.metrics_port, Some(9300));
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.listen.allow_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.limits.outbound_queue, 32);
        assert!(config.relay.require_join);
        assert_eq!(
            config.heartbeat.schedule(),
            Some((Duration::from_secs(20), Duration::from_secs(30)))
        );
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[server]\nlog_format = \"xml\"");
        assert!(result.is_err());
    }

    #[test]
    fn port_override() {
        let mut config = Config::default();
        config.override_port("4100").unwrap();
        assert_eq!(config.listen.address.port(), 4100);

        assert!(matches!(
            config.override_port("not-a-port"),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            config.override_port("70000"),
            Err(ConfigError::InvalidPort(_))
        ));
        assert_eq!(config.listen.address.port(), 4100);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listen]\naddress = \"127.0.0.1:5000\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.listen.address.port(), 5000);
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listen]\naddress = 12").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse(_))));
    }
}
