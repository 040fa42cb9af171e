//! The single-writer simulation loop.
//!
//! [`Simulation::run`] owns the [`Grid`] for its whole life. Each
//! iteration races two stimuli:
//!
//! - **Command arrival** -- the command is applied to the grid in full.
//! - **Tick deadline** -- the grid advances one generation.
//!
//! Both go through the same `select!`, so a command never observes a
//! half-advanced grid and a tick never starts while a command is being
//! applied. Ticks follow a fixed cadence; if the loop falls behind, the
//! next tick is delayed rather than bunched up.
//!
//! Snapshot delivery is the one effect that waits on a client. The
//! snapshot is materialized inside the loop, and the bounded hand-off to
//! the session's outbound queue runs on its own task, so a client that
//! never drains its queue costs the loop nothing.

use std::time::Duration;

use chrono::Utc;
use lifecast_grid::{Grid, Point};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::command::{Command, GridStats, SnapshotTarget};
use crate::config::LifecastConfig;
use crate::offer::{Offer, offer};

/// Capacity of the global command stream.
pub const COMMAND_CAPACITY: usize = 256;

/// Runtime parameters of the loop and its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    /// Time between generations.
    pub tick_interval: Duration,
    /// Bounded wait when delivering a snapshot.
    pub snapshot_offer: Duration,
    /// Bounded wait when submitting a command.
    pub command_offer: Duration,
    /// Fixed RNG seed for [`Command::Seed`]; clock-derived when `None`.
    pub rng_seed: Option<u64>,
}

impl SimulationSettings {
    /// Derive loop settings from the loaded configuration.
    pub const fn from_config(config: &LifecastConfig) -> Self {
        Self {
            tick_interval: config.timing.tick_interval(),
            snapshot_offer: config.timing.snapshot_offer(),
            command_offer: config.timing.command_offer(),
            rng_seed: config.seed.rng_seed,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self::from_config(&LifecastConfig::default())
    }
}

/// What the loop had done by the time it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSummary {
    /// Completed ticks.
    pub generation: u64,
    /// Live cells at shutdown.
    pub live_cells: usize,
    /// Commands applied over the loop's life.
    pub commands_applied: u64,
}

/// Cloneable producer side of the command stream.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    tx: mpsc::Sender<Command>,
    command_offer: Duration,
}

impl SimulationHandle {
    /// Create a bare command stream without a loop attached.
    ///
    /// [`Simulation::new`] uses this internally; callers that want to
    /// consume commands themselves (tests, alternative drivers) can hold
    /// the receiver directly.
    pub fn channel(capacity: usize, command_offer: Duration) -> (Self, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, command_offer }, rx)
    }

    /// Submit a command, waiting at most the configured command offer
    /// time for room on the stream.
    pub async fn submit(&self, command: Command) -> Offer {
        let kind = command.kind();
        let outcome = offer(&self.tx, command, self.command_offer).await;
        if outcome == Offer::Dropped {
            debug!(command = kind, "Command stream full, command dropped");
        }
        outcome
    }

    /// Submit a [`Command::Seed`].
    pub async fn seed(&self, count: usize, spread: u32) -> Offer {
        self.submit(Command::Seed { count, spread }).await
    }

    /// Submit a [`Command::InjectCells`].
    pub async fn inject(&self, points: Vec<Point>) -> Offer {
        self.submit(Command::InjectCells(points)).await
    }

    /// Submit a [`Command::Snapshot`] delivering to `target`.
    pub async fn request_snapshot(&self, target: SnapshotTarget) -> Offer {
        self.submit(Command::Snapshot(target)).await
    }

    /// Ask the loop for [`GridStats`].
    ///
    /// Returns `None` if the command could not be submitted or the loop
    /// stopped before answering.
    pub async fn stats(&self) -> Option<GridStats> {
        let (reply, answer) = oneshot::channel();
        if !self.submit(Command::Stats(reply)).await.is_delivered() {
            return None;
        }
        answer.await.ok()
    }

    /// Whether the loop has stopped consuming commands.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The loop that owns the grid.
#[derive(Debug)]
pub struct Simulation {
    grid: Grid,
    commands: mpsc::Receiver<Command>,
    settings: SimulationSettings,
    rng: StdRng,
    commands_applied: u64,
}

impl Simulation {
    /// Create a loop around `grid` and the handle that feeds it.
    pub fn new(grid: Grid, settings: SimulationSettings) -> (Self, SimulationHandle) {
        let (handle, commands) = SimulationHandle::channel(COMMAND_CAPACITY, settings.command_offer);
        let rng_seed = settings.rng_seed.unwrap_or_else(clock_seed);
        debug!(rng_seed, "Simulation RNG seeded");
        let simulation = Self {
            grid,
            commands,
            settings,
            rng: StdRng::seed_from_u64(rng_seed),
            commands_applied: 0,
        };
        (simulation, handle)
    }

    /// Run until every [`SimulationHandle`] has been dropped.
    ///
    /// In a running server some handle always outlives the loop, so this
    /// effectively runs forever; shutdown is the process's business.
    pub async fn run(mut self) -> SimulationSummary {
        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        info!(
            tick_interval_ms = self.settings.tick_interval.as_millis(),
            live_cells = self.grid.len(),
            "Simulation loop starting"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.apply(command);
                }
                _ = ticker.tick() => {
                    self.grid.tick();
                }
            }
        }

        let summary = SimulationSummary {
            generation: self.grid.generation(),
            live_cells: self.grid.len(),
            commands_applied: self.commands_applied,
        };
        info!(
            generation = summary.generation,
            live_cells = summary.live_cells,
            commands_applied = summary.commands_applied,
            "Simulation loop stopped, command stream closed"
        );
        summary
    }

    fn apply(&mut self, command: Command) {
        trace!(command = command.kind(), "Applying command");
        self.commands_applied = self.commands_applied.saturating_add(1);

        match command {
            Command::Seed { count, spread } => {
                let born = self.grid.seed(count, spread, &mut self.rng);
                info!(count, spread, born, "Grid seeded");
            }
            Command::InjectCells(points) => {
                let requested = points.len();
                let born = self.grid.extend(points);
                debug!(requested, born, "Cells injected");
            }
            Command::Snapshot(target) => {
                let points = self.grid.snapshot();
                let wait = self.settings.snapshot_offer;
                tokio::spawn(async move {
                    match offer(&target, points, wait).await {
                        Offer::Delivered => {}
                        Offer::Dropped => trace!("Outbound queue full, snapshot dropped"),
                        Offer::Closed => trace!("Session gone, snapshot dropped"),
                    }
                });
            }
            Command::Stats(reply) => {
                let torus = self.grid.topology();
                let stats = GridStats {
                    generation: self.grid.generation(),
                    live_cells: self.grid.len(),
                    width: torus.width(),
                    height: torus.height(),
                };
                if reply.send(stats).is_err() {
                    trace!("Stats requester gone before reply");
                }
            }
        }
    }
}

/// Seed material for the RNG when none is configured.
fn clock_seed() -> u64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .map_or_else(|| now.timestamp().unsigned_abs(), i64::unsigned_abs)
}
