//! Pairwise distance providers
//!
//! The M function only ever asks two questions of a pattern's geometry:
//! how far apart two points are, and which points lie within a radius of a
//! given point. [`DistanceProvider`] answers both, either from coordinates
//! ([`CoordinateDistances`]) or from a precomputed table
//! ([`TableDistances`]). The variant is chosen by the caller once, when the
//! provider is built.

mod coordinates;
pub mod kdtree;
mod table;

pub use coordinates::CoordinateDistances;
pub use kdtree::KdTree;
pub use table::TableDistances;

use markcorr_core::{Error, PointSet, Result};

/// Distances between the points of one pattern, indexed by point order.
pub trait DistanceProvider: Sync {
    /// Number of points
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance between points `i` and `j`
    fn distance(&self, i: usize, j: usize) -> f64;

    /// Append `(j, distance(i, j))` for every `j != i` with
    /// `distance(i, j) <= radius`. Order is unspecified.
    fn neighbors_within(&self, i: usize, radius: f64, out: &mut Vec<(usize, f64)>) {
        for j in (0..self.len()).filter(|&j| j != i) {
            let d = self.distance(i, j);
            if d <= radius {
                out.push((j, d));
            }
        }
    }
}

/// How distances are obtained for a located pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    /// Computed from coordinates on demand, with a k-d tree for radius queries
    #[default]
    Coordinates,
    /// Looked up in a full pairwise table built up front
    Table,
}

impl std::str::FromStr for DistanceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "coordinates" | "coords" | "c" => Ok(DistanceMode::Coordinates),
            "table" | "matrix" | "t" => Ok(DistanceMode::Table),
            _ => Err(Error::InvalidParameter {
                name: "distances",
                value: s.to_string(),
                reason: "expected 'coordinates' or 'table'".into(),
            }),
        }
    }
}

/// Build the provider selected by `mode` for a located pattern
pub fn distance_provider(points: &PointSet, mode: DistanceMode) -> Box<dyn DistanceProvider + '_> {
    match mode {
        DistanceMode::Coordinates => Box::new(CoordinateDistances::new(points)),
        DistanceMode::Table => Box::new(TableDistances::from_points(points)),
    }
}
