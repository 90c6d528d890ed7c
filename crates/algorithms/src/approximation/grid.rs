//! Grid approximation
//!
//! The bounding rectangle of the window is divided into a
//! `partitions × partitions` grid. All points of one type falling in the
//! same cell are replaced by a single point at the cell center whose weight
//! is the sum of theirs. Per-type weight totals are conserved; the number of
//! points merged into a cell is not kept, which is where the approximation
//! error of M comes from.

use std::collections::BTreeMap;

use tracing::debug;

use markcorr_core::{Error, Marks, PointSet, Result, TypeCode};

/// Aggregate a pattern on a `partitions × partitions` grid.
///
/// The output window is the bounding rectangle of the input window, so cell
/// centers of polygonal windows always lie inside it. Output points are
/// ordered by row, column, then type code; the label domain is unchanged.
///
/// # Errors
/// [`Error::InvalidPartitions`] if `partitions` is zero.
pub fn grid_approximation(points: &PointSet, partitions: usize) -> Result<PointSet> {
    if partitions == 0 {
        return Err(Error::InvalidPartitions(partitions));
    }

    let bounds = points.window().bounds();
    let marks = points.marks();

    let mut cells: BTreeMap<(usize, usize, TypeCode), f64> = BTreeMap::new();
    for (i, &(x, y)) in points.coords().iter().enumerate() {
        let (col, row) = bounds.cell_of(x, y, partitions);
        *cells.entry((row, col, marks.type_at(i))).or_insert(0.0) += marks.weight_at(i);
    }

    let mut coords = Vec::with_capacity(cells.len());
    let mut types = Vec::with_capacity(cells.len());
    let mut weights = Vec::with_capacity(cells.len());
    for ((row, col, code), weight) in cells {
        coords.push(bounds.cell_center(col, row, partitions));
        types.push(code);
        weights.push(weight);
    }

    debug!(
        input = points.len(),
        output = coords.len(),
        partitions,
        "grid approximation"
    );

    let marks = Marks::from_codes(marks.labels().to_vec(), types, weights)?;
    PointSet::from_parts(points.window().bounding_window(), coords, marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use markcorr_core::{Point, Window};

    fn pattern() -> PointSet {
        PointSet::new(
            Window::rectangle(0.0, 10.0, 0.0, 10.0).unwrap(),
            vec![
                Point::new(1.0, 1.0, "Case", 2.0),
                Point::new(2.0, 2.0, "Case", 3.0),
                Point::new(1.5, 4.0, "Control", 1.0),
                Point::new(7.0, 8.0, "Control", 4.0),
                Point::new(10.0, 10.0, "Control", 0.5),
                Point::new(6.0, 9.0, "Case", 1.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_merges_same_type_in_cell() {
        let grid = grid_approximation(&pattern(), 2).unwrap();
        // (row 0, col 0): Case 5.0, Control 1.0; (row 1, col 1): Case 1.0, Control 4.5
        assert_eq!(grid.len(), 4);

        let first = grid.point(0);
        assert_eq!(first.label, "Case");
        assert_relative_eq!(first.x, 2.5);
        assert_relative_eq!(first.y, 2.5);
        assert_relative_eq!(first.weight, 5.0);

        let last = grid.point(3);
        assert_eq!(last.label, "Control");
        assert_relative_eq!(last.x, 7.5);
        assert_relative_eq!(last.weight, 4.5);
    }

    #[test]
    fn test_weight_per_type_conserved() {
        let input = pattern();
        for partitions in [1, 2, 3, 7, 50] {
            let grid = grid_approximation(&input, partitions).unwrap();
            for label in ["Case", "Control"] {
                let before = input.marks().weight_of(input.require_type(label).unwrap());
                let after = grid.marks().weight_of(grid.require_type(label).unwrap());
                assert_relative_eq!(before, after, epsilon = 1e-12);
            }
            assert!(grid.len() <= 2 * partitions * partitions);
        }
    }

    #[test]
    fn test_single_cell() {
        let grid = grid_approximation(&pattern(), 1).unwrap();
        assert_eq!(grid.len(), 2);
        assert_relative_eq!(grid.point(1).x, 5.0);
        assert_relative_eq!(grid.point(1).y, 5.0);
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let err = grid_approximation(&pattern(), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidPartitions(0)));
    }

    #[test]
    fn test_polygon_window_uses_bounding_rectangle() {
        let window = Window::polygon(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]).unwrap();
        let input = PointSet::new(
            window,
            vec![
                Point::new(0.5, 0.5, "A", 1.0),
                Point::new(0.2, 3.5, "B", 1.0),
            ],
        )
        .unwrap();
        let grid = grid_approximation(&input, 2).unwrap();
        assert!(matches!(grid.window(), Window::Rectangle(_)));
        assert_eq!(grid.len(), 2);
        assert_relative_eq!(grid.point(1).x, 1.0);
        assert_relative_eq!(grid.point(1).y, 3.0);
    }
}
