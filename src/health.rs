use anyhow::{Context, Result};
use axum::{routing::get, Router};
use log::info;
use tokio_util::sync::CancellationToken;

/// Liveness endpoint for container orchestration. No dependencies are
/// checked: reachable process == healthy.
pub async fn serve_health(addr: String, cancel_token: CancellationToken) -> Result<()> {
    let router = Router::new().route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind health endpoint on {addr}"))?;

    info!("health endpoint listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await
        .context("health endpoint server failed")
}
