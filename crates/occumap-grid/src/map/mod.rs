//! Map-related functionality for sampling-based planning.
//!
//! This module provides the static occupancy grid built from an image and the
//! usage statistics it keeps.

pub mod occupancy;

pub use occupancy::{FREE_THRESHOLD, OccupancyGrid, UsageStats};
