//! Marked point pattern data structures

mod distance_table;
mod marks;
mod point_set;
mod window;

pub use distance_table::{DistanceTable, TabulatedPattern};
pub use marks::{Marks, TypeCode, TypeSummary};
pub use point_set::{euclidean, PatternSummary, Point, PointSet};
pub use window::{Bounds, Window};
