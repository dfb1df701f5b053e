//! Binds the listener and serves the router until a shutdown signal
//! arrives, draining in-flight requests and the durable log writer queue
//! first.

use crate::log_writer::{self, LogWriterHandle};
use crate::shutdown::{GracefulServer, ShutdownConfig};
use crate::state::AppState;
use cerebra_store::Store;
use std::net::SocketAddr;
use tracing::info;

/// Bind to `0.0.0.0:{port}` and serve `state`'s router until a shutdown
/// signal is received, then drain the log writer before returning.
pub async fn run(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "cerebra-gateway listening");

    let store = state.store.clone();
    let log_writer = state.log_writer.clone();

    let graceful = GracefulServer::new(ShutdownConfig::default());
    let coordinator = graceful.coordinator();
    let router = crate::routes::create_router(state, coordinator.clone());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_future(coordinator.clone()))
        .await?;

    coordinator.trigger_shutdown("server stopped").await;
    drain_log_writer(&log_writer, &store).await;

    Ok(())
}

async fn shutdown_future(coordinator: std::sync::Arc<crate::shutdown::ShutdownCoordinator>) {
    let reason = crate::shutdown::shutdown_signal().await;
    coordinator.trigger_shutdown(&reason).await;
}

async fn drain_log_writer(log_writer: &LogWriterHandle, store: &Store) {
    info!(queued = log_writer.queue_len(), "draining log writer before exit");
    log_writer::drain_remaining(log_writer, store).await;
}
