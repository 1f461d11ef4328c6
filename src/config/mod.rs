//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, RelayConfig, HeartbeatConfig)
//! - [`listen`]: WebSocket listener configuration (ListenConfig)
//! - [`limits`]: Queue and frame limits (LimitsConfig)
//! - [`validation`]: Startup checks

mod limits;
mod listen;
mod types;
mod validation;

pub use limits::LimitsConfig;
pub use listen::ListenConfig;
pub use types::{Config, LogFormat};
pub use validation::validate;
