//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("limits.outbound_queue must be at least 1")]
    ZeroOutboundQueue,
    #[error("limits.max_frame_bytes must be at least 1")]
    ZeroFrameLimit,
    #[error("limits.max_username_len must be at least 1")]
    ZeroUsernameLimit,
    #[error("listen.address and server.metrics_port both use port {0}")]
    PortConflict(u16),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    if config.limits.outbound_queue == 0 {
        errors.push(ValidationError::ZeroOutboundQueue);
    }
    if config.limits.max_frame_bytes == 0 {
        errors.push(ValidationError::ZeroFrameLimit);
    }
    if config.limits.max_username_len == 0 {
        errors.push(ValidationError::ZeroUsernameLimit);
    }

    let listen_port = config.listen.address.port();
    if listen_port != 0 && config.server.metrics_port == Some(listen_port) {
        errors.push(ValidationError::PortConflict(listen_port));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let config: Config = toml::from_str(
            r#"
[server]
name = ""
metrics_port = 3000

[limits]
outbound_queue = 0
max_frame_bytes = 0
"#,
        )
        .unwrap();

        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::MissingServerName));
        assert!(matches!(errors[1], ValidationError::ZeroOutboundQueue));
        assert!(matches!(errors[2], ValidationError::ZeroFrameLimit));
        assert!(matches!(errors[3], ValidationError::PortConflict(3000)));
    }
}
