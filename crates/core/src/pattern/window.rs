//! Observation window of a point pattern

use geo::{Area, BoundingRect, Intersects};
use geo_types::{LineString, Point, Polygon};

use crate::error::{Error, Result};

/// Axis-aligned bounding box of a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Length of the diagonal
    pub fn diameter(&self) -> f64 {
        self.width().hypot(self.height())
    }

    /// Index `(col, row)` of the cell of a `partitions × partitions` grid
    /// laid over these bounds that contains `(x, y)`.
    ///
    /// Points on the upper edges belong to the last column/row.
    pub fn cell_of(&self, x: f64, y: f64, partitions: usize) -> (usize, usize) {
        let last = partitions.saturating_sub(1);
        let col = ((x - self.min_x) / self.width() * partitions as f64).floor();
        let row = ((y - self.min_y) / self.height() * partitions as f64).floor();
        (
            (col.max(0.0) as usize).min(last),
            (row.max(0.0) as usize).min(last),
        )
    }

    /// Center of grid cell `(col, row)` in a `partitions × partitions` grid
    pub fn cell_center(&self, col: usize, row: usize, partitions: usize) -> (f64, f64) {
        let cell_w = self.width() / partitions as f64;
        let cell_h = self.height() / partitions as f64;
        (
            self.min_x + (col as f64 + 0.5) * cell_w,
            self.min_y + (row as f64 + 0.5) * cell_h,
        )
    }
}

/// The region containing all points of a pattern.
///
/// Membership is boundary-inclusive: a point lying exactly on the
/// window edge belongs to the window.
#[derive(Debug, Clone, PartialEq)]
pub enum Window {
    /// Axis-aligned rectangle
    Rectangle(Bounds),
    /// Simple polygon (exterior ring only)
    Polygon(Polygon<f64>),
}

impl Window {
    /// Create a rectangular window `[min_x, max_x] × [min_y, max_y]`
    pub fn rectangle(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Self> {
        let all_finite = [min_x, max_x, min_y, max_y].iter().all(|v| v.is_finite());
        if !all_finite || min_x >= max_x || min_y >= max_y {
            return Err(Error::InvalidWindow(format!(
                "rectangle [{min_x}, {max_x}] x [{min_y}, {max_y}] is empty or not finite"
            )));
        }
        Ok(Window::Rectangle(Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }))
    }

    /// Create a polygonal window from its exterior vertices.
    ///
    /// The ring is closed automatically; repeating the first vertex is allowed.
    pub fn polygon(vertices: &[(f64, f64)]) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(Error::InvalidWindow(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(Error::InvalidWindow("polygon vertex is not finite".into()));
        }
        let polygon = Polygon::new(LineString::from(vertices.to_vec()), vec![]);
        if polygon.unsigned_area() <= 0.0 {
            return Err(Error::InvalidWindow("polygon has zero area".into()));
        }
        Ok(Window::Polygon(polygon))
    }

    /// Whether `(x, y)` lies inside the window or on its boundary
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Window::Rectangle(b) => x >= b.min_x && x <= b.max_x && y >= b.min_y && y <= b.max_y,
            Window::Polygon(p) => p.intersects(&Point::new(x, y)),
        }
    }

    /// Bounding box of the window
    pub fn bounds(&self) -> Bounds {
        match self {
            Window::Rectangle(b) => *b,
            Window::Polygon(p) => {
                // Validated polygons have a non-empty exterior
                let rect = p.bounding_rect().unwrap_or_else(|| {
                    geo_types::Rect::new((0.0, 0.0), (0.0, 0.0))
                });
                Bounds {
                    min_x: rect.min().x,
                    min_y: rect.min().y,
                    max_x: rect.max().x,
                    max_y: rect.max().y,
                }
            }
        }
    }

    /// Window area
    pub fn area(&self) -> f64 {
        match self {
            Window::Rectangle(b) => b.area(),
            Window::Polygon(p) => p.unsigned_area(),
        }
    }

    /// Exterior vertices (closing vertex excluded)
    pub fn vertices(&self) -> Vec<(f64, f64)> {
        match self {
            Window::Rectangle(b) => vec![
                (b.min_x, b.min_y),
                (b.max_x, b.min_y),
                (b.max_x, b.max_y),
                (b.min_x, b.max_y),
            ],
            Window::Polygon(p) => {
                let coords: Vec<(f64, f64)> = p.exterior().coords().map(|c| (c.x, c.y)).collect();
                match coords.split_last() {
                    Some((last, rest)) if rest.first() == Some(last) => rest.to_vec(),
                    _ => coords,
                }
            }
        }
    }

    /// The bounding rectangle as a window of its own
    pub fn bounding_window(&self) -> Window {
        Window::Rectangle(self.bounds())
    }
}
