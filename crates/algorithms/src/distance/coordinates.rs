//! Distances computed from point coordinates

use markcorr_core::{euclidean, PointSet};

use super::{DistanceProvider, KdTree};

/// Relative slack on the k-d tree search radius. Candidates are filtered
/// again on the exact distance, so the slack only guards against squaring
/// rounding and never admits a pair beyond the radius.
const SEARCH_SLACK: f64 = 1e-9;

/// Coordinate-backed distances.
///
/// Distances are computed lazily from the borrowed coordinates. The
/// indexed variant keeps a k-d tree (O(n) memory) so radius queries only
/// visit nearby points; the unindexed variant holds nothing beyond the
/// borrow and scans every point.
#[derive(Debug)]
pub struct CoordinateDistances<'a> {
    coords: &'a [(f64, f64)],
    index: Option<KdTree>,
}

impl<'a> CoordinateDistances<'a> {
    /// Coordinate distances with a spatial index
    pub fn new(points: &'a PointSet) -> Self {
        Self::from_coords(points.coords(), true)
    }

    /// Coordinate distances without a spatial index
    pub fn unindexed(points: &'a PointSet) -> Self {
        Self::from_coords(points.coords(), false)
    }

    pub fn from_coords(coords: &'a [(f64, f64)], indexed: bool) -> Self {
        let index = indexed.then(|| KdTree::build(coords));
        Self { coords, index }
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

impl DistanceProvider for CoordinateDistances<'_> {
    fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    fn distance(&self, i: usize, j: usize) -> f64 {
        euclidean(self.coords[i], self.coords[j])
    }

    fn neighbors_within(&self, i: usize, radius: f64, out: &mut Vec<(usize, f64)>) {
        let Some(tree) = &self.index else {
            for j in (0..self.coords.len()).filter(|&j| j != i) {
                let d = self.distance(i, j);
                if d <= radius {
                    out.push((j, d));
                }
            }
            return;
        };

        let (qx, qy) = self.coords[i];
        let mut candidates = Vec::new();
        tree.within_radius(qx, qy, radius * (1.0 + SEARCH_SLACK), &mut candidates);
        for j in candidates.into_iter().filter(|&j| j != i) {
            let d = self.distance(i, j);
            if d <= radius {
                out.push((j, d));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use markcorr_core::{Point, Window};

    fn grid_points() -> PointSet {
        let window = Window::rectangle(0.0, 10.0, 0.0, 10.0).unwrap();
        let points = (0..100).map(|k| {
            let x = (k % 10) as f64 + 0.5;
            let y = (k / 10) as f64 + 0.5;
            Point::new(x, y, if k % 3 == 0 { "A" } else { "B" }, 1.0)
        });
        PointSet::new(window, points).unwrap()
    }

    #[test]
    fn test_distance() {
        let set = grid_points();
        let d = CoordinateDistances::new(&set);
        assert_eq!(d.len(), 100);
        assert_relative_eq!(d.distance(0, 11), 2.0_f64.sqrt());
        assert_relative_eq!(d.distance(5, 5), 0.0);
    }

    #[test]
    fn test_indexed_matches_unindexed() {
        let set = grid_points();
        let indexed = CoordinateDistances::new(&set);
        let plain = CoordinateDistances::unindexed(&set);
        assert!(indexed.is_indexed());
        assert!(!plain.is_indexed());

        for i in [0, 37, 55, 99] {
            for radius in [0.0, 1.0, 1.5, 3.2] {
                let mut a = Vec::new();
                let mut b = Vec::new();
                indexed.neighbors_within(i, radius, &mut a);
                plain.neighbors_within(i, radius, &mut b);
                a.sort_by_key(|(j, _)| *j);
                b.sort_by_key(|(j, _)| *j);
                assert_eq!(a, b, "point {i} radius {radius}");
            }
        }
    }

    #[test]
    fn test_boundary_inclusive_and_self_excluded() {
        let set = grid_points();
        let d = CoordinateDistances::new(&set);
        let mut out = Vec::new();
        d.neighbors_within(11, 1.0, &mut out);
        let mut js: Vec<usize> = out.iter().map(|(j, _)| *j).collect();
        js.sort_unstable();
        assert_eq!(js, vec![1, 10, 12, 21]);
    }
}
