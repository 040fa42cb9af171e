//! Plane topology: how coordinates wrap and which cells are adjacent.
//!
//! The [`Topology`] trait maps raw coordinates onto the plane and yields
//! the Moore neighborhood of a cell. [`Torus`] is the only implementation:
//! a finite `width x height` plane whose edges wrap around, so stepping
//! off the right edge lands on the left edge and likewise vertically.

use crate::error::GridError;
use crate::point::Point;

/// Moore-neighborhood offsets as `(row, col)` pairs.
///
/// Enumerated as offset index `i` in `0..9` with `i == 4` (the cell
/// itself) skipped, where `row = i / 3 - 1` and `col = i % 3 - 1`. The
/// order is part of the public contract of [`Topology::neighbors`].
const MOORE_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A coordinate-mapping strategy for the simulation plane.
pub trait Topology {
    /// Map an arbitrary coordinate onto the plane.
    fn wrap(&self, p: Point) -> Point;

    /// The eight Moore neighbors of `p`, already wrapped, in row-major
    /// offset order (top-left first, bottom-right last).
    fn neighbors(&self, p: Point) -> [Point; 8];
}

/// A finite wraparound plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Torus {
    width: u32,
    height: u32,
}

impl Torus {
    /// Create a torus of the given extent.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] if either axis is zero.
    pub const fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of columns.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Wrap `p` and then step it by `(col, row)`, wrapping again.
    fn step(&self, p: Point, col: i64, row: i64) -> Point {
        let w = i64::from(self.width);
        let h = i64::from(self.height);
        // Both axes are reduced into [0, extent) first, so a +-1 step can
        // never overflow.
        Point::new(
            p.x.rem_euclid(w).wrapping_add(col).rem_euclid(w),
            p.y.rem_euclid(h).wrapping_add(row).rem_euclid(h),
        )
    }
}

impl Topology for Torus {
    fn wrap(&self, p: Point) -> Point {
        self.step(p, 0, 0)
    }

    fn neighbors(&self, p: Point) -> [Point; 8] {
        MOORE_OFFSETS.map(|(row, col)| self.step(p, col, row))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn torus(w: u32, h: u32) -> Torus {
        Torus::new(w, h).unwrap()
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert_eq!(
            Torus::new(0, 10),
            Err(GridError::InvalidDimensions {
                width: 0,
                height: 10
            })
        );
        assert!(Torus::new(10, 0).is_err());
        assert!(Torus::new(1, 1).is_ok());
    }

    #[test]
    fn neighbor_order_is_row_major() {
        let t = torus(256, 256);
        let expected = [
            (9, 9),
            (10, 9),
            (11, 9),
            (9, 10),
            (11, 10),
            (9, 11),
            (10, 11),
            (11, 11),
        ]
        .map(|(x, y)| Point::new(x, y));
        assert_eq!(t.neighbors(Point::new(10, 10)), expected);
    }

    #[test]
    fn offsets_follow_index_formula() {
        let derived: Vec<(i64, i64)> = (0_i64..9)
            .filter(|i| *i != 4)
            .map(|i| (i / 3 - 1, i % 3 - 1))
            .collect();
        assert_eq!(derived, MOORE_OFFSETS.to_vec());
    }

    #[test]
    fn neighbors_wrap_at_every_edge() {
        let t = torus(22, 22);
        let corner = t.neighbors(Point::new(0, 0));
        assert_eq!(corner[0], Point::new(21, 21));
        assert_eq!(corner[7], Point::new(1, 1));

        let far = t.neighbors(Point::new(21, 21));
        assert_eq!(far[0], Point::new(20, 20));
        assert_eq!(far[7], Point::new(0, 0));
    }

    #[test]
    fn neighbors_are_distinct_in_range_and_exclude_self() {
        let t = torus(5, 7);
        for x in 0..5 {
            for y in 0..7 {
                let p = Point::new(x, y);
                let ns = t.neighbors(p);
                let unique: BTreeSet<Point> = ns.iter().copied().collect();
                assert_eq!(unique.len(), 8, "duplicates around {p}");
                assert!(!unique.contains(&p));
                for n in ns {
                    assert!((0..5).contains(&n.x) && (0..7).contains(&n.y));
                }
            }
        }
    }

    #[test]
    fn wrap_handles_far_out_of_range_coordinates() {
        let t = torus(256, 256);
        assert_eq!(t.wrap(Point::new(256, 0)), Point::new(0, 0));
        assert_eq!(t.wrap(Point::new(-1, -257)), Point::new(255, 255));
        assert_eq!(t.wrap(Point::new(i64::MIN, i64::MAX)), Point::new(0, 255));
    }
}
