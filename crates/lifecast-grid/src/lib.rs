//! Sparse cell grid, toroidal topology, and birth/survival rule for the
//! Lifecast simulation.
//!
//! This is the leaf crate of the workspace. It knows nothing about
//! channels, sockets, or time; the simulation loop in `lifecast-core`
//! owns a single [`Grid`] and drives it.
//!
//! # Modules
//!
//! - [`point`] -- [`Point`] coordinates and their wire encoding.
//! - [`topology`] -- [`Topology`] trait and the [`Torus`] wraparound plane.
//! - [`rule`] -- [`Rule`] trait and the fixed [`ClassicRule`] (B3/S23).
//! - [`grid`] -- the two-generation [`Grid`] and its `tick`.
//! - [`error`] -- [`GridError`].

pub mod error;
pub mod grid;
pub mod point;
pub mod rule;
pub mod topology;

pub use error::GridError;
pub use grid::Grid;
pub use point::Point;
pub use rule::{ClassicRule, Rule};
pub use topology::{Topology, Torus};
