//! Test server management.
//!
//! Spawns and manages duetd instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A generated config file for one duetd instance.
pub struct TestConfig {
    path: PathBuf,
    port: u16,
    _dir: TempDir,
}

impl TestConfig {
    /// Write a config listening on a free local port.
    ///
    /// `server_keys` lands inside the `[server]` table, `extra` after it.
    pub fn write(server_keys: &str, extra: &str) -> anyhow::Result<Self> {
        let port = free_port()?;
        let dir = tempfile::tempdir()?;

        let path = dir.path().join("config.toml");
        let content = format!(
            r#"
[server]
name = "test.duet"
{server_keys}

[listen]
address = "127.0.0.1:{port}"

{extra}
"#
        );
        std::fs::write(&path, content)?;
        Ok(Self {
            path,
            port,
            _dir: dir,
        })
    }

    /// A `duetd` command running this config.
    pub fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_duetd"));
        command
            .arg(&self.path)
            .env_remove("PORT")
            .env("RUST_LOG", "warn");
        command
    }
}

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    _config: TestConfig,
}

impl TestServer {
    /// Spawn a test server with default relay settings.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with("").await
    }

    /// Spawn a test server, appending `extra` TOML to the generated config.
    pub async fn spawn_with(extra: &str) -> anyhow::Result<Self> {
        Self::spawn_configured("", extra).await
    }

    /// Spawn a test server with extra `[server]` keys and trailing TOML.
    pub async fn spawn_configured(server_keys: &str, extra: &str) -> anyhow::Result<Self> {
        let config = TestConfig::write(server_keys, extra)?;
        let child = config.command().spawn()?;

        let server = Self {
            child,
            port: config.port,
            _config: config,
        };

        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// WebSocket URL of the server.
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}/", self.port)
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.url()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Ask the OS for a port that is free right now.
pub fn free_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
