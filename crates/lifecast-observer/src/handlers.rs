//! REST endpoint handlers for the observer server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/stats` | Generation, population, plane size, sessions |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ObserverError;
use crate::state::AppState;

/// Body of `GET /api/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Generations the simulation has advanced.
    pub generation: u64,
    /// Live cells right now.
    pub live_cells: usize,
    /// Plane width.
    pub width: u32,
    /// Plane height.
    pub height: u32,
    /// Connected `WebSocket` sessions.
    pub sessions_active: usize,
    /// When the observer started.
    pub started_at: DateTime<Utc>,
    /// Whole seconds since `started_at`.
    pub uptime_seconds: u64,
}

// ---------------------------------------------------------------------------
// GET /api/stats
// ---------------------------------------------------------------------------

/// Ask the simulation loop for its counters and add the observer's own.
///
/// Returns `503 Service Unavailable` when the loop has stopped or does not
/// take the request within its command timeout.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ObserverError> {
    let stats = state
        .simulation
        .stats()
        .await
        .ok_or_else(|| ObserverError::Unavailable("simulation did not answer".to_owned()))?;

    Ok(Json(StatsResponse {
        generation: stats.generation,
        live_cells: stats.live_cells,
        width: stats.width,
        height: stats.height,
        sessions_active: state.sessions_active(),
        started_at: state.started_at,
        uptime_seconds: state.uptime_seconds(),
    }))
}
