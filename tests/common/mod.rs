//! Integration test common infrastructure.
//!
//! Provides utilities for spawning test servers, creating WebSocket test
//! clients, and asserting on relay event flows.

// Each test binary uses a different subset of the helpers.
#[allow(dead_code)]
pub mod client;
#[allow(dead_code)]
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::{TestConfig, TestServer, free_port};
