//! Spatial aggregation of point patterns
//!
//! - **grid**: snap points to the centers of a regular grid, merging the
//!   weights of same-type points per cell

mod grid;

pub use grid::grid_approximation;
