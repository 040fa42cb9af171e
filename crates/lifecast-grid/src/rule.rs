//! Birth/survival rule.

/// Decides a cell's fate from its current state and live-neighbor count.
///
/// Implementations must be pure: the same inputs always give the same
/// answer, and nothing outside the arguments is consulted.
pub trait Rule {
    /// Whether the cell is alive in the next generation.
    fn survives(&self, alive: bool, live_neighbors: u8) -> bool;
}

/// Conway's rule, B3/S23: a cell is born with exactly three live
/// neighbors and survives with two or three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassicRule;

impl Rule for ClassicRule {
    fn survives(&self, alive: bool, live_neighbors: u8) -> bool {
        live_neighbors == 3 || (live_neighbors == 2 && alive)
    }
}
