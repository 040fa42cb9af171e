//! Cell coordinates.
//!
//! A [`Point`] is an `(x, y)` pair of signed 64-bit integers. Points carry
//! no identity beyond their value; a live cell is simply a point present in
//! the grid's cell set.
//!
//! # Wire format
//!
//! Points travel as JSON objects with integer `x` and `y` fields. Clients
//! written against looser encoders sometimes quote numbers, so each field
//! also accepts a numeric string. Whatever the representation, the value
//! must fit in an `i64` and must be integral; anything else rejects the
//! whole message.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// A cell coordinate on the simulation plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column.
    #[serde(alias = "X", deserialize_with = "deserialize_coordinate")]
    pub x: i64,
    /// Row.
    #[serde(alias = "Y", deserialize_with = "deserialize_coordinate")]
    pub y: i64,
}

impl Point {
    /// Create a point from its coordinates.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for Point {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(CoordinateVisitor)
}

struct CoordinateVisitor;

impl Visitor<'_> for CoordinateVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer or numeric string representable as i64")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_overflow| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        Err(E::invalid_value(Unexpected::Float(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.parse::<i64>()
            .map_err(|_parse| E::invalid_value(Unexpected::Str(v), &self))
    }
}
