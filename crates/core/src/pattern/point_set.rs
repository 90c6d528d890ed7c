//! Typed, weighted, located point collections

use crate::error::{Error, Result};
use crate::pattern::{Marks, TypeCode, TypeSummary, Window};

/// Euclidean distance between two coordinates.
///
/// Every distance in the workspace goes through this function so that
/// tabulated and on-the-fly distances agree bit for bit.
#[inline]
pub fn euclidean(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// A single located, typed, weighted point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Type label, e.g. "Case" / "Control"
    pub label: String,
    /// Strictly positive weight
    pub weight: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, label: impl Into<String>, weight: f64) -> Self {
        Self {
            x,
            y,
            label: label.into(),
            weight,
        }
    }
}

/// An ordered collection of points sharing one [`Window`].
///
/// Point order is preserved exactly as given: results never depend on it,
/// but randomized procedures index points by position, so a stable order
/// keeps them reproducible.
///
/// # Example
///
/// ```ignore
/// use markcorr_core::{Point, PointSet, Window};
///
/// let window = Window::rectangle(0.0, 10.0, 0.0, 10.0)?;
/// let set = PointSet::new(window, vec![
///     Point::new(1.0, 1.0, "Case", 2.0),
///     Point::new(2.0, 1.0, "Control", 3.0),
/// ])?;
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PointSet {
    window: Window,
    coords: Vec<(f64, f64)>,
    marks: Marks,
}

impl PointSet {
    /// Create a point set, checking window containment and weights.
    pub fn new<I>(window: Window, points: I) -> Result<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let points: Vec<Point> = points.into_iter().collect();
        let coords = points.iter().map(|p| (p.x, p.y)).collect();
        let marks = Marks::new(points.iter().map(|p| (p.label.as_str(), p.weight)))?;
        Self::from_parts(window, coords, marks)
    }

    /// Create a point set from coordinates and parallel marks.
    pub fn from_parts(window: Window, coords: Vec<(f64, f64)>, marks: Marks) -> Result<Self> {
        if coords.len() != marks.len() {
            return Err(Error::Algorithm(format!(
                "{} coordinates but {} marks",
                coords.len(),
                marks.len()
            )));
        }
        for (index, &(x, y)) in coords.iter().enumerate() {
            if !x.is_finite() || !y.is_finite() || !window.contains(x, y) {
                return Err(Error::PointOutsideWindow { index, x, y });
            }
        }
        Ok(Self {
            window,
            coords,
            marks,
        })
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn coords(&self) -> &[(f64, f64)] {
        &self.coords
    }

    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    /// Materialize point `i`
    pub fn point(&self, i: usize) -> Point {
        let (x, y) = self.coords[i];
        Point {
            x,
            y,
            label: self.marks.label(self.marks.type_at(i)).to_string(),
            weight: self.marks.weight_at(i),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.len()).map(move |i| self.point(i))
    }

    /// Code of a type that must be present in the pattern
    pub fn require_type(&self, label: &str) -> Result<TypeCode> {
        self.marks.require(label)
    }

    /// Summary statistics of the pattern
    pub fn summary(&self) -> PatternSummary {
        let area = self.window.area();
        PatternSummary {
            points: self.len(),
            total_weight: self.marks.total_weight(),
            area,
            intensity: self.len() as f64 / area,
            types: self.marks.summary(),
        }
    }
}

/// Descriptive statistics of a [`PointSet`]
#[derive(Debug, Clone)]
pub struct PatternSummary {
    pub points: usize,
    pub total_weight: f64,
    /// Window area
    pub area: f64,
    /// Points per unit area
    pub intensity: f64,
    pub types: Vec<TypeSummary>,
}
