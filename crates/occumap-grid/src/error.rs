//! This module defines the error types used by the `occumap-grid` crate.

#![warn(missing_docs)]

use thiserror::Error;

/// Error type for occupancy map operations.
///
/// Every variant is terminal for the call that produced it. The map never
/// retries, clamps or returns partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// The input image is missing, undecodable or not a valid intensity grid.
    /// A map is never constructed when this is returned.
    #[error("Failed to load occupancy map: {0}")]
    Load(String),
    /// Free-space sampling was requested on a map without any free cell.
    #[error("Occupancy map has no free space to sample from")]
    EmptyFreeSpace,
    /// An occupancy query fell outside the grid after truncation.
    #[error("Map access out of bounds: ({x}, {y}) is outside {width}x{height}")]
    OutOfBounds {
        /// Truncated x coordinate, saturated for non-finite input.
        x: i64,
        /// Truncated y coordinate, saturated for non-finite input.
        y: i64,
        /// Grid width in cells.
        width: usize,
        /// Grid height in cells.
        height: usize,
    },
}

impl MapError {
    pub(crate) fn load(msg: impl Into<String>) -> Self {
        MapError::Load(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MapError>;
