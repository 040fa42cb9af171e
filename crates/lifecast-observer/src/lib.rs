//! Observer server for the Lifecast simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) -- one [`Session`] per connection,
//!   streaming full snapshots out and accepting cell injections in
//! - **Stats endpoint** (`/api/stats`) -- generation, population, plane
//!   size, and connected sessions as JSON
//! - **Static assets** -- every other path is served from the configured
//!   static directory (the browser client lives there)
//!
//! # Architecture
//!
//! The observer never touches the grid. Every read and write goes through
//! the [`SimulationHandle`] held in [`AppState`], so the simulation loop
//! stays the single writer. The WebSocket is split into a reader and a
//! writer half and handed to the session protocol in `lifecast-core`;
//! this crate only frames and decodes messages.
//!
//! [`Session`]: lifecast_core::Session
//! [`SimulationHandle`]: lifecast_core::SimulationHandle

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{RunningObserver, StartupError, spawn_observer};
pub use state::AppState;
