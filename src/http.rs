//! HTTP server for Prometheus metrics endpoint.
//!
//! Runs on a separate tokio task and serves `/metrics` for Prometheus scraping.

use axum::{Router, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Bind the metrics listener on `0.0.0.0:port`.
///
/// Done up front so that a taken port fails startup instead of a
/// background task.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind metrics endpoint on {addr}: {e}"))?;
    tracing::info!(addr = %listener.local_addr()?, "Prometheus HTTP server listening");
    Ok(listener)
}

/// Serve `/metrics` until the listener fails.
pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_reports_port_in_use() {
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = bind(port).await.unwrap_err();
        assert!(err.to_string().contains(&port.to_string()));
    }

    #[tokio::test]
    async fn serves_metrics_text() {
        crate::metrics::init();
        crate::metrics::set_connected_clients(3);

        let listener = bind(0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener));

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", addr.port())).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(
            &mut stream,
            b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();
        let mut body = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut body).await.unwrap();

        assert!(body.starts_with("HTTP/1.1 200"));
        assert!(body.contains("duet_connected_clients"));
        server.abort();
    }
}
