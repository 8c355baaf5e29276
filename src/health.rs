//! Liveness endpoint for hosting platforms that probe an HTTP port.

use std::net::SocketAddr;

use axum::{Router, routing::get};
use color_eyre::eyre::{Result, WrapErr};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// GET / - fixed acknowledgment that the process is up.
pub async fn liveness() -> &'static str {
    "running"
}

pub fn router() -> Router {
    Router::new().route("/", get(liveness))
}

/// Serve [`router`] on `0.0.0.0:port` until `cancel` fires.
pub async fn serve(port: u16, cancel: CancellationToken) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind health endpoint on {addr}"))?;
    info!("health endpoint listening on {addr}");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .wrap_err("health endpoint failed")
}
