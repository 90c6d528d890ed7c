//! Distances looked up in a precomputed table

use std::borrow::Cow;

use markcorr_core::{DistanceTable, PointSet};

use super::DistanceProvider;

/// Table-backed distances: O(1) lookups, O(n²) memory.
#[derive(Debug, Clone)]
pub struct TableDistances<'a> {
    table: Cow<'a, DistanceTable>,
}

impl<'a> TableDistances<'a> {
    /// Borrow an existing table
    pub fn new(table: &'a DistanceTable) -> Self {
        Self {
            table: Cow::Borrowed(table),
        }
    }

    /// Tabulate the distances of a located pattern
    pub fn from_points(points: &PointSet) -> TableDistances<'static> {
        TableDistances {
            table: Cow::Owned(DistanceTable::from_points(points)),
        }
    }

    pub fn table(&self) -> &DistanceTable {
        &self.table
    }
}

impl DistanceProvider for TableDistances<'_> {
    fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    fn distance(&self, i: usize, j: usize) -> f64 {
        self.table.get(i, j)
    }

    fn neighbors_within(&self, i: usize, radius: f64, out: &mut Vec<(usize, f64)>) {
        out.extend(
            self.table
                .row(i)
                .iter()
                .enumerate()
                .filter(|&(j, &d)| j != i && d <= radius)
                .map(|(j, &d)| (j, d)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lookup_and_neighbors() {
        let table = DistanceTable::from_rows(vec![
            vec![0.0, 1.0, 3.0],
            vec![1.0, 0.0, 2.0],
            vec![3.0, 2.0, 0.0],
        ])
        .unwrap();
        let d = TableDistances::new(&table);
        assert_eq!(d.len(), 3);
        assert_relative_eq!(d.distance(2, 1), 2.0);

        let mut out = Vec::new();
        d.neighbors_within(1, 2.0, &mut out);
        assert_eq!(out, vec![(0, 1.0), (2, 2.0)]);

        out.clear();
        d.neighbors_within(0, 0.5, &mut out);
        assert!(out.is_empty());
    }
}
