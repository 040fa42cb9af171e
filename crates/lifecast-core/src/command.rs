//! Commands consumed by the simulation loop.
//!
//! A [`Command`] is created by a producer (a client session, the startup
//! seeder, the stats endpoint), moved onto the command stream, and applied
//! exactly once by the [`Simulation`](crate::Simulation). Nothing else
//! touches the grid.

use lifecast_grid::Point;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Where a snapshot is delivered: the requesting session's outbound queue.
pub type SnapshotTarget = mpsc::Sender<Vec<Point>>;

/// A deferred mutation of, or read from, the grid.
#[derive(Debug)]
pub enum Command {
    /// Scatter up to `count` live cells over `[0, spread)^2`.
    Seed {
        /// Number of random draws.
        count: usize,
        /// Side of the square the draws land in.
        spread: u32,
    },

    /// Bring the given cells to life.
    InjectCells(Vec<Point>),

    /// Deliver every live cell to the target, with a bounded wait.
    Snapshot(SnapshotTarget),

    /// Reply with aggregate grid figures.
    Stats(oneshot::Sender<GridStats>),
}

impl Command {
    /// Short variant name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Seed { .. } => "seed",
            Self::InjectCells(_) => "inject_cells",
            Self::Snapshot(_) => "snapshot",
            Self::Stats(_) => "stats",
        }
    }
}

/// Aggregate figures about the grid at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridStats {
    /// Completed ticks since startup.
    pub generation: u64,
    /// Number of live cells.
    pub live_cells: usize,
    /// Plane width.
    pub width: u32,
    /// Plane height.
    pub height: u32,
}
