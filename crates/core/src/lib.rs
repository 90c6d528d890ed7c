//! # markcorr Core
//!
//! Core types and I/O for weighted marked point patterns.
//!
//! This crate provides:
//! - `PointSet`: located, typed, weighted points inside a `Window`
//! - `Marks`: the `(type, weight)` list shared by every representation
//! - `DistanceTable` / `TabulatedPattern`: precomputed pairwise distances
//!   paired with marks, for patterns without coordinates
//! - `RadiusSequence`: validated radii at which statistics are evaluated
//! - JSON I/O for patterns, tables and results

pub mod error;
pub mod io;
pub mod pattern;
pub mod radius;

pub use error::{Error, Result};
pub use pattern::{
    euclidean, Bounds, DistanceTable, Marks, PatternSummary, Point, PointSet, TabulatedPattern, TypeCode,
    TypeSummary, Window,
};
pub use radius::RadiusSequence;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::pattern::{
        DistanceTable, Marks, Point, PointSet, TabulatedPattern, TypeCode, Window,
    };
    pub use crate::radius::RadiusSequence;
}
