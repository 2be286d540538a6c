//! Binary occupancy maps for sampling-based motion planning.
//!
//! An [`OccupancyGrid`] is built once from a decoded grayscale image, then
//! answers point occupancy queries and draws uniform samples over the whole
//! grid or over free space only.
//!
//! ```no_run
//! use occumap_grid::OccupancyGrid;
//!
//! let map = OccupancyGrid::open("map.png")?.seeded(1);
//! let goal = map.sample_valid_state()?;
//! assert!(!map.is_occupied(goal.x as f64, goal.y as f64)?);
//! # Ok::<(), occumap_grid::MapError>(())
//! ```

pub mod error;
pub mod intensity;
pub mod loader;
pub mod map;
pub mod point_types;

pub use error::MapError;
pub use intensity::IntensityImage;
pub use loader::load_intensity_image;
pub use map::{FREE_THRESHOLD, OccupancyGrid, UsageStats};
pub use point_types::GridPoint;
