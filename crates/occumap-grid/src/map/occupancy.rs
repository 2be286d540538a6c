//! Binary occupancy grid with a precomputed free-space index.
//!
//! The grid is a static snapshot of an input image. It is thresholded once at
//! construction and never modified afterwards; only the two usage counters
//! change over the lifetime of a map.
//!
//! # Orientation
//!
//! Images are turned a quarter turn clockwise when loaded, so the stored grid
//! has shape `(image_width, image_height)` and
//!
//! ```text
//! stored[x][y] = image[image_height - 1 - y][x]
//! ```
//!
//! `x` is therefore the image column and `y` counts rows upward from the
//! bottom edge of the image. Sampling returns and queries consume coordinates
//! in this orientation; the turn is never applied again after construction.

#![warn(missing_docs)]

use crate::error::{MapError, Result};
use crate::intensity::IntensityImage;
use crate::loader::load_intensity_image;
use crate::point_types::GridPoint;
use nalgebra::SVector;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Cells strictly brighter than this are free, everything else is occupied.
pub const FREE_THRESHOLD: f32 = 0.5;

/// Snapshot of the usage counters of one map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsageStats {
    /// Sampling calls of either kind since construction or the last reset.
    pub samplings: u64,
    /// Occupancy queries since construction or the last reset.
    pub map_accesses: u64,
}

impl std::fmt::Display for UsageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Samplings {}", self.samplings)?;
        write!(f, "Map Access {}", self.map_accesses)
    }
}

/// Static 2D occupancy map for sampling-based planners.
///
/// Sharing a map between threads is safe: the grid is read-only, the counters
/// are atomic and the internal random source sits behind a mutex.
#[derive(Debug)]
pub struct OccupancyGrid {
    /// Size in cells along each axis (x, y).
    dims: SVector<usize, 2>,
    /// Intensities stored x-major: cell `(x, y)` is at `x * height + y`.
    cells: Vec<f32>,
    /// Every free cell, in scan order.
    free_cells: Vec<GridPoint>,
    sampling_counter: AtomicU64,
    map_access_counter: AtomicU64,
    rng: Mutex<StdRng>,
}

impl OccupancyGrid {
    /// Builds a map from decoded image intensities.
    ///
    /// Channel 0 is used when the image has several channels, and the image is
    /// turned as described in the module docs.
    ///
    /// # Returns
    /// * `Result<Self, MapError>` - The map, or `MapError::Load` if the image
    ///   cannot provide an intensity plane.
    pub fn new(image: &IntensityImage) -> Result<Self> {
        let plane = image
            .channel(0)
            .ok_or_else(|| MapError::load("image has no intensity channel"))?;
        let (image_height, image_width) = plane.shape();

        let mut cells = Vec::with_capacity(image_width * image_height);
        for x in 0..image_width {
            for y in 0..image_height {
                cells.push(plane[(image_height - 1 - y, x)]);
            }
        }

        Self::from_cells(image_width, image_height, cells)
    }

    /// Builds a map from a grid that is already in stored orientation.
    ///
    /// `cells` is x-major: cell `(x, y)` is `cells[x * height + y]`. No turn is
    /// applied.
    pub fn from_cells(width: usize, height: usize, cells: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::load(format!(
                "grid has zero area ({width}x{height})"
            )));
        }
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| MapError::load("grid dimensions too large, would cause overflow"))?;
        if cells.len() != expected {
            return Err(MapError::load(format!(
                "grid holds {} cells, expected {expected} for {width}x{height}",
                cells.len()
            )));
        }

        let free_cells: Vec<GridPoint> = cells
            .iter()
            .enumerate()
            .filter(|(_, intensity)| **intensity > FREE_THRESHOLD)
            .map(|(index, _)| GridPoint::new(index / height, index % height))
            .collect();

        if free_cells.is_empty() {
            warn!(width, height, "Occupancy map has no free cells");
        }
        info!(
            width,
            height,
            free_cells = free_cells.len(),
            "Occupancy map constructed"
        );

        Ok(Self {
            dims: SVector::<usize, 2>::new(width, height),
            cells,
            free_cells,
            sampling_counter: AtomicU64::new(0),
            map_access_counter: AtomicU64::new(0),
            rng: Mutex::new(StdRng::from_os_rng()),
        })
    }

    /// Decodes the image at `path` and builds a map from it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let image = load_intensity_image(path)?;
        Self::new(&image)
    }

    /// Replaces the internal random source with one seeded from `seed`.
    #[must_use]
    pub fn seeded(self, seed: u64) -> Self {
        debug!(seed, "Seeding occupancy map sampler");
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Grid width (extent of `x`).
    pub fn width(&self) -> usize {
        self.dims[0]
    }

    /// Grid height (extent of `y`).
    pub fn height(&self) -> usize {
        self.dims[1]
    }

    /// Size in cells along each axis.
    pub fn get_dims(&self) -> &SVector<usize, 2> {
        &self.dims
    }

    /// Free-cell index, in scan order (`x` major, then `y`).
    pub fn free_cells(&self) -> &[GridPoint] {
        &self.free_cells
    }

    /// Raw intensity of a cell. Does not count as a map access.
    pub fn intensity(&self, point: GridPoint) -> Option<f32> {
        if point.x < self.width() && point.y < self.height() {
            Some(self.cells[point.x * self.height() + point.y])
        } else {
            None
        }
    }

    /// Draws a cell uniformly over the whole grid, free or not.
    pub fn sample_state(&self) -> GridPoint {
        let mut rng = self.rng.lock();
        self.sample_state_with(&mut *rng)
    }

    /// Same as [`Self::sample_state`] but draws from a caller supplied source.
    pub fn sample_state_with<R: Rng>(&self, rng: &mut R) -> GridPoint {
        self.sampling_counter.fetch_add(1, Ordering::Relaxed);
        GridPoint::new(
            rng.random_range(0..self.width()),
            rng.random_range(0..self.height()),
        )
    }

    /// Draws a cell uniformly from the free-cell index.
    ///
    /// The call is counted even when it fails.
    ///
    /// # Returns
    /// * `Result<GridPoint, MapError>` - A free cell, or
    ///   `MapError::EmptyFreeSpace` if the map has none.
    pub fn sample_valid_state(&self) -> Result<GridPoint> {
        let mut rng = self.rng.lock();
        self.sample_valid_state_with(&mut *rng)
    }

    /// Same as [`Self::sample_valid_state`] but draws from a caller supplied source.
    pub fn sample_valid_state_with<R: Rng>(&self, rng: &mut R) -> Result<GridPoint> {
        self.sampling_counter.fetch_add(1, Ordering::Relaxed);
        if self.free_cells.is_empty() {
            return Err(MapError::EmptyFreeSpace);
        }
        let index = rng.random_range(0..self.free_cells.len());
        Ok(self.free_cells[index])
    }

    /// Checks whether the cell containing `(x, y)` is occupied.
    ///
    /// Coordinates are truncated toward zero, so `(1.9, -0.5)` reads cell
    /// `(1, 0)`. The query is counted even when it fails.
    ///
    /// # Returns
    /// * `Result<bool, MapError>` - `true` for intensities `<= 0.5`, or
    ///   `MapError::OutOfBounds` if the truncated cell lies outside the grid.
    pub fn is_occupied(&self, x: impl Into<f64>, y: impl Into<f64>) -> Result<bool> {
        self.map_access_counter.fetch_add(1, Ordering::Relaxed);
        let point = self.checked_cell(x.into(), y.into())?;
        Ok(self.cells[point.x * self.height() + point.y] <= FREE_THRESHOLD)
    }

    fn checked_cell(&self, x: f64, y: f64) -> Result<GridPoint> {
        let (tx, ty) = (x.trunc(), y.trunc());
        let in_range = |v: f64, extent: usize| v.is_finite() && v >= 0.0 && v < extent as f64;

        if in_range(tx, self.width()) && in_range(ty, self.height()) {
            Ok(GridPoint::new(tx as usize, ty as usize))
        } else {
            Err(MapError::OutOfBounds {
                x: tx as i64,
                y: ty as i64,
                width: self.width(),
                height: self.height(),
            })
        }
    }

    /// Sampling calls since construction or the last reset.
    pub fn sampling_count(&self) -> u64 {
        self.sampling_counter.load(Ordering::Relaxed)
    }

    /// Occupancy queries since construction or the last reset.
    pub fn map_access_count(&self) -> u64 {
        self.map_access_counter.load(Ordering::Relaxed)
    }

    /// Current values of both counters.
    pub fn statistics(&self) -> UsageStats {
        UsageStats {
            samplings: self.sampling_count(),
            map_accesses: self.map_access_count(),
        }
    }

    /// Sets both counters back to zero. The grid itself is untouched.
    pub fn reset_counters(&self) {
        self.sampling_counter.store(0, Ordering::Relaxed);
        self.map_access_counter.store(0, Ordering::Relaxed);
        debug!("Occupancy map counters reset");
    }

    /// Logs the counters at info level and returns them.
    pub fn print_statistics(&self) -> UsageStats {
        let stats = self.statistics();
        info!(
            samplings = stats.samplings,
            map_accesses = stats.map_accesses,
            "Occupancy map usage"
        );
        stats
    }
}

/// Upright rendering: the top line is `y = height - 1`, `.` is free and `#`
/// is occupied.
impl std::fmt::Display for OccupancyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "OccupancyGrid ({}x{})", self.width(), self.height())?;
        for y in (0..self.height()).rev() {
            for x in 0..self.width() {
                let free = self.cells[x * self.height() + y] > FREE_THRESHOLD;
                write!(f, "{}", if free { '.' } else { '#' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    /// 4x4 grid whose `x = 0` column is free and everything else occupied.
    fn first_row_free() -> OccupancyGrid {
        let mut cells = vec![0.0; 16];
        cells[..4].fill(1.0);
        OccupancyGrid::from_cells(4, 4, cells).unwrap().seeded(7)
    }

    #[test]
    fn test_image_is_turned_clockwise() {
        // Image rows (top to bottom): [a b c], [d e f]
        let plane = DMatrix::from_row_slice(2, 3, &[0.1, 0.2, 0.3, 0.4, 0.6, 0.7]);
        let grid = OccupancyGrid::new(&IntensityImage::from_plane(&plane).unwrap()).unwrap();

        assert_eq!((grid.width(), grid.height()), (3, 2));
        // Bottom-left pixel of the image is the origin.
        assert_eq!(grid.intensity(GridPoint::new(0, 0)), Some(0.4));
        assert_eq!(grid.intensity(GridPoint::new(0, 1)), Some(0.1));
        assert_eq!(grid.intensity(GridPoint::new(2, 0)), Some(0.7));
        assert_eq!(grid.intensity(GridPoint::new(2, 1)), Some(0.3));
        assert_eq!(grid.intensity(GridPoint::new(3, 0)), None);

        assert_eq!(
            grid.free_cells(),
            &[GridPoint::new(1, 0), GridPoint::new(2, 0)]
        );
    }

    #[test]
    fn test_uses_first_channel_only() {
        // 2x1 RGB image: red says (free, occupied), green and blue say the opposite.
        let image =
            IntensityImage::new(2, 1, 3, vec![1.0, 0.0, 0.0, 0.0, 1.0, 1.0]).unwrap();
        let grid = OccupancyGrid::new(&image).unwrap();
        assert_eq!(grid.free_cells(), &[GridPoint::new(0, 0)]);
        assert!(!grid.is_occupied(0, 0).unwrap());
        assert!(grid.is_occupied(1, 0).unwrap());
    }

    #[test]
    fn test_invalid_cells() {
        assert!(matches!(
            OccupancyGrid::from_cells(0, 4, vec![]),
            Err(MapError::Load(_))
        ));
        assert!(matches!(
            OccupancyGrid::from_cells(2, 2, vec![1.0; 3]),
            Err(MapError::Load(_))
        ));
    }

    #[test]
    fn test_first_row_free_scenario() {
        let grid = first_row_free();
        assert_eq!(grid.free_cells().len(), 4);
        assert!(grid.free_cells().iter().all(|p| p.x == 0));

        for _ in 0..200 {
            assert_eq!(grid.sample_valid_state().unwrap().x, 0);
        }
        assert!(!grid.is_occupied(0, 0).unwrap());
        assert!(grid.is_occupied(2, 2).unwrap());
    }

    #[test]
    fn test_same_scenario_from_image() {
        // Leftmost image column free: after the turn it becomes x = 0.
        let plane = DMatrix::from_fn(4, 4, |_, col| if col == 0 { 1.0 } else { 0.0 });
        let grid = OccupancyGrid::new(&IntensityImage::from_plane(&plane).unwrap()).unwrap();
        assert_eq!(grid.free_cells(), first_row_free().free_cells());
    }

    #[test]
    fn test_sample_state_bounds() {
        let grid = OccupancyGrid::from_cells(5, 3, vec![0.0; 15])
            .unwrap()
            .seeded(42);
        let mut seen_max = (false, false);
        for _ in 0..2000 {
            let p = grid.sample_state();
            assert!(p.x < 5 && p.y < 3);
            seen_max.0 |= p.x == 4;
            seen_max.1 |= p.y == 2;
        }
        assert_eq!(seen_max, (true, true));
    }

    #[test]
    fn test_sample_valid_state_is_free() {
        let cells = (0..64).map(|i| if i % 3 == 0 { 0.9 } else { 0.1 }).collect();
        let grid = OccupancyGrid::from_cells(8, 8, cells).unwrap().seeded(3);
        for _ in 0..500 {
            let p = grid.sample_valid_state().unwrap();
            assert!(grid.free_cells().contains(&p));
            assert!(!grid.is_occupied(p.x as f64, p.y as f64).unwrap());
        }
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let a = first_row_free().seeded(11);
        let b = first_row_free().seeded(11);
        for _ in 0..20 {
            assert_eq!(a.sample_state(), b.sample_state());
            assert_eq!(a.sample_valid_state(), b.sample_valid_state());
        }
    }

    #[test]
    fn test_external_rng_is_counted() {
        let grid = first_row_free();
        let mut rng = StdRng::seed_from_u64(1);
        grid.sample_state_with(&mut rng);
        grid.sample_valid_state_with(&mut rng).unwrap();
        assert_eq!(grid.sampling_count(), 2);
    }

    #[test]
    fn test_counter_accounting() {
        let grid = first_row_free();
        grid.sample_state();
        grid.is_occupied(0, 0).unwrap();
        grid.reset_counters();

        for i in 0..7 {
            if i % 2 == 0 {
                grid.sample_state();
            } else {
                grid.sample_valid_state().unwrap();
            }
            if i < 5 {
                grid.is_occupied(1, 1).unwrap();
            }
        }
        assert_eq!(
            grid.statistics(),
            UsageStats {
                samplings: 7,
                map_accesses: 5
            }
        );
        assert_eq!(grid.print_statistics(), grid.statistics());

        grid.reset_counters();
        assert_eq!(grid.statistics(), UsageStats::default());
        assert_eq!(grid.free_cells().len(), 4);
    }

    #[test]
    fn test_failed_calls_are_counted() {
        let grid = OccupancyGrid::from_cells(2, 2, vec![0.0; 4]).unwrap();
        assert!(grid.sample_valid_state().is_err());
        assert!(grid.is_occupied(5, 5).is_err());
        assert_eq!(grid.sampling_count(), 1);
        assert_eq!(grid.map_access_count(), 1);
    }

    #[test]
    fn test_concurrent_counting() {
        let grid = first_row_free();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..250 {
                        grid.sample_state();
                        grid.sample_valid_state().unwrap();
                        grid.is_occupied(0, 1).unwrap();
                    }
                });
            }
        });
        assert_eq!(grid.sampling_count(), 2000);
        assert_eq!(grid.map_access_count(), 1000);
    }

    #[test]
    fn test_threshold_boundary() {
        let grid = OccupancyGrid::from_cells(3, 1, vec![0.5, 0.50001, 0.49999]).unwrap();
        assert!(grid.is_occupied(0, 0).unwrap());
        assert!(!grid.is_occupied(1, 0).unwrap());
        assert!(grid.is_occupied(2, 0).unwrap());
        assert_eq!(grid.free_cells(), &[GridPoint::new(1, 0)]);
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = first_row_free();
        let (w, h) = (grid.width() as i32, grid.height() as i32);
        for (x, y) in [(w, 0), (-1, 0), (0, h)] {
            assert!(matches!(
                grid.is_occupied(x, y),
                Err(MapError::OutOfBounds { .. })
            ));
        }
        assert!(matches!(
            grid.is_occupied(f64::NAN, 0.0),
            Err(MapError::OutOfBounds { .. })
        ));
        assert!(matches!(
            grid.is_occupied(f64::INFINITY, 0.0),
            Err(MapError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_fractional_coordinates_truncate() {
        let grid = first_row_free();
        assert!(!grid.is_occupied(0.99, 3.5).unwrap());
        assert!(grid.is_occupied(1.0, 0.2).unwrap());
        // Truncation toward zero keeps small negative values on the edge.
        assert!(!grid.is_occupied(-0.5, 0.0).unwrap());
        assert!(grid.is_occupied(3.99, 3.99).unwrap());
        assert!(grid.is_occupied(4.0, 0.0).is_err());
    }

    #[test]
    fn test_empty_free_space() {
        for k in [1, 3, 6] {
            let grid = OccupancyGrid::from_cells(k, k, vec![0.5; k * k]).unwrap();
            assert!(grid.free_cells().is_empty());
            assert_eq!(grid.sample_valid_state(), Err(MapError::EmptyFreeSpace));
        }
    }

    #[test]
    fn test_display_is_upright() {
        // Image with only its top-right pixel free.
        let plane = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let grid = OccupancyGrid::new(&IntensityImage::from_plane(&plane).unwrap()).unwrap();
        assert_eq!(grid.to_string(), "OccupancyGrid (3x2)\n##.\n###\n");
    }

    #[test]
    fn test_stats_display() {
        let stats = UsageStats {
            samplings: 3,
            map_accesses: 9,
        };
        assert_eq!(stats.to_string(), "Samplings 3\nMap Access 9");
    }
}
