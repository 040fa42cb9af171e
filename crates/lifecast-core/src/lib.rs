//! Simulation loop, command stream, and client session protocol for
//! Lifecast.
//!
//! The [`Grid`](lifecast_grid::Grid) is owned by exactly one task, the
//! [`Simulation`] loop. Everything else talks to it by sending
//! [`Command`]s through a [`SimulationHandle`], so grid state is never
//! shared and never locked. Each connected observer runs a [`Session`]:
//! three cooperating tasks that bridge a transport to the command stream
//! without ever letting a slow client stall the loop.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `lifecast-config.yaml`.
//! - [`command`] -- [`Command`] variants consumed by the loop.
//! - [`offer`] -- Bounded-wait-then-drop delivery onto queues.
//! - [`simulation`] -- The single-writer loop and its handle.
//! - [`session`] -- Per-client receive/send/coordinate protocol.

pub mod command;
pub mod config;
pub mod offer;
pub mod session;
pub mod simulation;

pub use command::{Command, GridStats, SnapshotTarget};
pub use config::{ConfigError, LifecastConfig};
pub use offer::{Offer, offer};
pub use session::{
    CloseReason, Liveness, PointReader, PointWriter, Session, SessionId, SessionPhase,
    SessionReport, SessionSettings, TransportError,
};
pub use simulation::{Simulation, SimulationHandle, SimulationSettings, SimulationSummary};
