use image::{Rgb, RgbImage};
use occumap_grid::{GridPoint, OccupancyGrid};

const FREE: Rgb<u8> = Rgb([255, 255, 255]);
const OCCUPIED: Rgb<u8> = Rgb([0, 0, 0]);
const STATE_SAMPLE: Rgb<u8> = Rgb([31, 119, 180]);
const VALID_SAMPLE: Rgb<u8> = Rgb([255, 127, 14]);

/// Draws the map upright with both sample sets on top, one pixel per cell.
///
/// Free-space samples are drawn last so they stay visible where the two
/// sets overlap.
pub fn render_samples(
    map: &OccupancyGrid,
    state_samples: &[GridPoint],
    valid_samples: &[GridPoint],
) -> RgbImage {
    let (width, height) = (map.width() as u32, map.height() as u32);
    let mut canvas = RgbImage::from_fn(width, height, |px, py| {
        let cell = GridPoint::new(px as usize, (height - 1 - py) as usize);
        match map.intensity(cell) {
            Some(v) if v > occumap_grid::FREE_THRESHOLD => FREE,
            _ => OCCUPIED,
        }
    });

    for (samples, colour) in [(state_samples, STATE_SAMPLE), (valid_samples, VALID_SAMPLE)] {
        for p in samples {
            if p.x < map.width() && p.y < map.height() {
                canvas.put_pixel(p.x as u32, height - 1 - p.y as u32, colour);
            }
        }
    }
    canvas
}
