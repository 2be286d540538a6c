//! Decoded image intensities handed to the occupancy map.
//!
//! The map only reads intensities; decoding from a file format happens in
//! [`crate::loader`] or in the caller.

#![warn(missing_docs)]

use crate::error::{MapError, Result};
use nalgebra::DMatrix;

/// Row-major floating point image with one or more interleaved channels.
///
/// Values are nominally in `[0, 1]`. Pixel `(row, col)` channel `c` lives at
/// `(row * width + col) * channels + c`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityImage {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl IntensityImage {
    /// Creates an image from an interleaved row-major buffer.
    ///
    /// # Returns
    /// * `Result<Self, MapError>` - `MapError::Load` if the image has zero area,
    ///   no channels, or a buffer whose length does not match its dimensions.
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::load(format!(
                "image has zero area ({width}x{height})"
            )));
        }
        if channels == 0 {
            return Err(MapError::load("image has no channels"));
        }

        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| MapError::load("image dimensions too large, would cause overflow"))?;
        if data.len() != expected {
            return Err(MapError::load(format!(
                "buffer holds {} values, expected {expected} for {width}x{height}x{channels}",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Creates a single-channel image from a matrix whose rows are image rows.
    pub fn from_plane(plane: &DMatrix<f32>) -> Result<Self> {
        let (height, width) = plane.shape();
        let data = (0..height)
            .flat_map(|row| (0..width).map(move |col| plane[(row, col)]))
            .collect();
        Self::new(width, height, 1, data)
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Extracts one channel as a `height x width` matrix.
    ///
    /// Returns `None` if `channel` is not present.
    pub fn channel(&self, channel: usize) -> Option<DMatrix<f32>> {
        if channel >= self.channels {
            return None;
        }
        Some(DMatrix::from_fn(self.height, self.width, |row, col| {
            self.data[(row * self.width + col) * self.channels + channel]
        }))
    }
}
