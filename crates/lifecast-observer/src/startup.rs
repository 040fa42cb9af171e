//! Background startup for embedding the observer in the server binary.
//!
//! [`spawn_observer`] binds eagerly, so an address that is taken fails
//! startup instead of surfacing later from a background task, and then
//! serves on its own Tokio task alongside the simulation loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the observer.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A running observer.
#[derive(Debug)]
pub struct RunningObserver {
    /// Address actually bound (resolves port `0`).
    pub local_addr: SocketAddr,
    /// The serving task. Abort it to stop accepting connections.
    pub task: JoinHandle<()>,
}

/// Bind `config` and serve the observer on a background task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or cannot be
/// bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<RunningObserver, StartupError> {
    let listener = server::bind(config).await?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let task = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%local_addr, "Observer server spawned on background task");

    Ok(RunningObserver { local_addr, task })
}
