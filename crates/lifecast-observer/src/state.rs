//! Shared application state for the observer server.
//!
//! [`AppState`] holds the producer side of the simulation's command stream
//! and the per-session timeouts. It holds no grid data: the loop owns the
//! grid and answers through commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use lifecast_core::{SessionSettings, SimulationHandle};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    /// Command stream into the simulation loop.
    pub simulation: SimulationHandle,
    /// Timeouts applied to every new session.
    pub session_settings: SessionSettings,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
    /// When the observer was created.
    pub started_at: DateTime<Utc>,
    sessions_active: AtomicUsize,
}

impl AppState {
    /// Create application state around a running simulation.
    pub fn new(
        simulation: SimulationHandle,
        session_settings: SessionSettings,
        static_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            simulation,
            session_settings,
            static_dir: static_dir.into(),
            started_at: Utc::now(),
            sessions_active: AtomicUsize::new(0),
        }
    }

    /// Number of WebSocket sessions currently running.
    pub fn sessions_active(&self) -> usize {
        self.sessions_active.load(Ordering::Acquire)
    }

    /// Count a session as active until the returned guard drops.
    pub fn track_session(self: &Arc<Self>) -> SessionTracker {
        self.sessions_active.fetch_add(1, Ordering::AcqRel);
        SessionTracker {
            state: Arc::clone(self),
        }
    }

    /// Whole seconds since [`Self::started_at`].
    pub fn uptime_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if clocks are weird; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

/// Keeps a session counted in [`AppState::sessions_active`].
#[derive(Debug)]
pub struct SessionTracker {
    state: Arc<AppState>,
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        self.state.sessions_active.fetch_sub(1, Ordering::AcqRel);
    }
}
