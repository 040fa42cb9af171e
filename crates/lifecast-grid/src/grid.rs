//! The two-generation sparse cell grid.
//!
//! A [`Grid`] stores only live cells. `current` is the authoritative
//! generation that snapshots read; `next` is scratch space filled during
//! [`Grid::tick`] and swapped in at the end. Outside a tick `next` is
//! always empty.
//!
//! A tick only evaluates cells that are alive or adjacent to something
//! alive, so its cost is proportional to the live population (at most nine
//! candidates per live cell) and independent of the plane's size.
//!
//! Every point stored in the grid is wrapped onto the plane on the way in,
//! so `current` never holds an out-of-range coordinate.

use std::collections::HashSet;

use rand::Rng;
use tracing::trace;

use crate::point::Point;
use crate::rule::{ClassicRule, Rule};
use crate::topology::{Topology, Torus};

/// Sparse set of live cells on a plane, with a fixed rule.
#[derive(Debug, Clone)]
pub struct Grid<T = Torus, R = ClassicRule> {
    /// Authoritative live cells.
    current: HashSet<Point>,
    /// Scratch buffer for the generation being computed.
    next: HashSet<Point>,
    topology: T,
    rule: R,
    generation: u64,
}

impl Grid {
    /// Create an empty grid on `torus` using the classic rule.
    pub fn new(torus: Torus) -> Self {
        Self::with_rule(torus, ClassicRule)
    }
}

impl<T: Topology, R: Rule> Grid<T, R> {
    /// Create an empty grid from an explicit topology and rule.
    pub fn with_rule(topology: T, rule: R) -> Self {
        Self {
            current: HashSet::new(),
            next: HashSet::new(),
            topology,
            rule,
            generation: 0,
        }
    }

    /// The plane this grid lives on.
    pub const fn topology(&self) -> &T {
        &self.topology
    }

    /// Number of completed ticks.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of live cells.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Whether no cell is alive.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Whether `p` (after wrapping) is alive.
    pub fn contains(&self, p: Point) -> bool {
        self.current.contains(&self.topology.wrap(p))
    }

    /// The eight neighbors of `p` in the topology's fixed order.
    pub fn neighbors(&self, p: Point) -> [Point; 8] {
        self.topology.neighbors(p)
    }

    /// Whether `p` will be alive in the next generation.
    pub fn will_live(&self, p: Point) -> bool {
        will_live(&self.current, &self.topology, &self.rule, p)
    }

    /// Bring `p` to life. Returns `true` if it was dead.
    pub fn insert(&mut self, p: Point) -> bool {
        let p = self.topology.wrap(p);
        self.current.insert(p)
    }

    /// Bring every point in `points` to life.
    ///
    /// Returns how many of them were previously dead.
    pub fn extend<I>(&mut self, points: I) -> usize
    where
        I: IntoIterator<Item = Point>,
    {
        points.into_iter().filter(|p| self.insert(*p)).count()
    }

    /// Scatter up to `count` live cells uniformly over `[0, spread)^2`.
    ///
    /// Repeated draws land on the same cell, so `count` is an upper bound
    /// on how many cells come to life. Returns the number that did.
    pub fn seed<G>(&mut self, count: usize, spread: u32, rng: &mut G) -> usize
    where
        G: Rng + ?Sized,
    {
        if spread == 0 {
            return 0;
        }
        let mut born = 0_usize;
        for _ in 0..count {
            let p = Point::new(
                i64::from(rng.random_range(0..spread)),
                i64::from(rng.random_range(0..spread)),
            );
            if self.insert(p) {
                born = born.saturating_add(1);
            }
        }
        born
    }

    /// All live cells in internal iteration order.
    ///
    /// The order is not stable between calls.
    pub fn snapshot(&self) -> Vec<Point> {
        self.current.iter().copied().collect()
    }

    /// Advance the grid by one generation.
    pub fn tick(&mut self) {
        debug_assert!(self.next.is_empty(), "next generation not cleared");

        {
            let Self {
                current,
                next,
                topology,
                rule,
                ..
            } = &mut *self;

            for &cell in current.iter() {
                let candidates = std::iter::once(cell).chain(topology.neighbors(cell));
                for candidate in candidates {
                    if next.contains(&candidate) {
                        continue;
                    }
                    if will_live(current, topology, rule, candidate) {
                        next.insert(candidate);
                    }
                }
            }

            std::mem::swap(current, next);
            next.clear();
        }
        self.generation = self.generation.saturating_add(1);

        trace!(
            generation = self.generation,
            live = self.current.len(),
            "Grid advanced"
        );
    }
}

fn will_live<T: Topology, R: Rule>(
    current: &HashSet<Point>,
    topology: &T,
    rule: &R,
    p: Point,
) -> bool {
    let live = topology
        .neighbors(p)
        .iter()
        .filter(|n| current.contains(n))
        .count();
    // At most eight neighbors, so this never saturates.
    let live = u8::try_from(live).unwrap_or(u8::MAX);
    rule.survives(current.contains(&p), live)
}
