//! Image file decoding into [`IntensityImage`].

use crate::error::{MapError, Result};
use crate::intensity::IntensityImage;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// Decodes an image file into normalized `f32` intensities.
///
/// The source channel layout is kept (luma, luma+alpha, rgb or rgba) so the
/// map can pick channel 0 itself. 8 and 16 bit sources are scaled to `[0, 1]`.
pub fn load_intensity_image(path: impl AsRef<Path>) -> Result<IntensityImage> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| MapError::load(format!("cannot decode {}: {e}", path.display())))?;
    debug!(path = %path.display(), color = ?img.color(), "Decoded map image");
    intensity_from_dynamic(&img)
}

/// Converts an already decoded image into normalized intensities.
pub fn intensity_from_dynamic(img: &DynamicImage) -> Result<IntensityImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;

    let (channels, data) = match img.color().channel_count() {
        1 => (1, img.to_luma32f().into_raw()),
        2 => (2, img.to_luma_alpha32f().into_raw()),
        3 => (3, img.to_rgb32f().into_raw()),
        _ => (4, img.to_rgba32f().into_raw()),
    };

    IntensityImage::new(width, height, channels, data)
}
