//! Test WebSocket client.
//!
//! Sends relay events and asserts on what the server pushes back.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A test relay client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send an event envelope.
    pub async fn send_event(&mut self, event: &str, data: Value) -> anyhow::Result<()> {
        let envelope = json!({ "event": event, "data": data });
        self.send_raw(&envelope.to_string()).await
    }

    pub async fn join(&mut self, username: &str) -> anyhow::Result<()> {
        self.send_event("join", json!({ "username": username })).await
    }

    pub async fn send_midi(&mut self, message: Value) -> anyhow::Result<()> {
        self.send_event("midi", json!({ "message": message })).await
    }

    /// Receive the next event envelope.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive the next event envelope with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Value> {
        loop {
            let frame = timeout(dur, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => anyhow::bail!("connection closed"),
                _ => continue,
            }
        }
    }

    /// Receive events until one named `event` arrives.
    pub async fn recv_event(&mut self, event: &str) -> anyhow::Result<Value> {
        loop {
            let envelope = self.recv().await?;
            if envelope["event"] == event {
                return Ok(envelope);
            }
        }
    }

    /// Receive presence events until one lists exactly `names`.
    pub async fn expect_presence(&mut self, names: &[&str]) -> anyhow::Result<()> {
        loop {
            let envelope = self.recv_event("presence").await?;
            let got: Vec<&str> = envelope["data"]
                .as_array()
                .map(|list| list.iter().filter_map(|e| e["username"].as_str()).collect())
                .unwrap_or_default();
            if got == names {
                return Ok(());
            }
        }
    }

    /// Assert nothing arrives within `dur`.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_timeout(dur).await {
            Err(e) if e.is::<tokio::time::error::Elapsed>() => Ok(()),
            Err(e) => Err(e),
            Ok(envelope) => anyhow::bail!("unexpected event: {envelope}"),
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
