//! Error types for the `lifecast-grid` crate.

/// Errors that can occur while constructing grid geometry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    /// A torus needs a finite, strictly positive extent on both axes.
    #[error("invalid grid dimensions {width}x{height}: both must be at least 1")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
