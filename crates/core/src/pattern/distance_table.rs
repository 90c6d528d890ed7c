//! Precomputed pairwise distances

use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};
use crate::pattern::{euclidean, Marks, PointSet};

/// Symmetric matrix of non-negative distances with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    data: Array2<f64>,
}

impl DistanceTable {
    /// Wrap a square matrix, checking symmetry, the zero diagonal and
    /// that every entry is finite and non-negative.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows != cols {
            return Err(Error::InvalidDistanceTable(format!(
                "matrix is {rows}x{cols}, expected a square matrix"
            )));
        }

        for i in 0..rows {
            if data[(i, i)] != 0.0 {
                return Err(Error::InvalidDistanceTable(format!(
                    "diagonal entry ({i}, {i}) is {}",
                    data[(i, i)]
                )));
            }
            for j in (i + 1)..cols {
                let d = data[(i, j)];
                for (r, c) in [(i, j), (j, i)] {
                    let v = data[(r, c)];
                    if !v.is_finite() || v < 0.0 {
                        return Err(Error::InvalidDistanceTable(format!(
                            "entry ({r}, {c}) = {v} is not a finite non-negative distance"
                        )));
                    }
                }
                let tol = 1e-12 * d.max(1.0);
                if (d - data[(j, i)]).abs() > tol {
                    return Err(Error::InvalidDistanceTable(format!(
                        "entries ({i}, {j}) = {d} and ({j}, {i}) = {} differ",
                        data[(j, i)]
                    )));
                }
            }
        }

        Ok(Self { data })
    }

    /// Build from nested rows
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(Error::InvalidDistanceTable(format!(
                "row {i} has {} entries, expected {n}",
                row.len()
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n, n), flat)
            .map_err(|e| Error::InvalidDistanceTable(e.to_string()))?;
        Self::new(data)
    }

    /// Euclidean distances between all points of a pattern
    pub fn from_points(points: &PointSet) -> Self {
        let coords = points.coords();
        let n = coords.len();
        let mut data = Array2::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(coords[i], coords[j]);
                data[(i, j)] = d;
                data[(j, i)] = d;
            }
        }
        Self { data }
    }

    /// Number of points indexed by the table
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    /// Distances from point `i` to every point
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}

/// A distance table paired with the `(type, weight)` list of the same
/// points, in the same order. No coordinates are needed.
#[derive(Debug, Clone)]
pub struct TabulatedPattern {
    table: DistanceTable,
    marks: Marks,
}

impl TabulatedPattern {
    pub fn new(table: DistanceTable, marks: Marks) -> Result<Self> {
        if table.len() != marks.len() {
            return Err(Error::InconsistentRepresentations {
                table: table.len(),
                marks: marks.len(),
            });
        }
        Ok(Self { table, marks })
    }

    /// Tabulate the distances of a located pattern
    pub fn from_points(points: &PointSet) -> Self {
        Self {
            table: DistanceTable::from_points(points),
            marks: points.marks().clone(),
        }
    }

    pub fn table(&self) -> &DistanceTable {
        &self.table
    }

    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    pub fn into_parts(self) -> (DistanceTable, Marks) {
        (self.table, self.marks)
    }
}
