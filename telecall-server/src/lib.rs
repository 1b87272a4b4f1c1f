mod config;
mod room;
mod signaling;

pub use config::*;
pub use room::*;
pub use signaling::*;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws/{room_id}", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(service)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Serves the relay on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    service: RelayService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Relay server failed")
}

/// Binds `config.bind` and serves until Ctrl-C.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Signaling relay listening on ws://{}", listener.local_addr()?);

    let service = RelayService::new(&config);
    serve_on(listener, service, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down relay");
    })
    .await
}
