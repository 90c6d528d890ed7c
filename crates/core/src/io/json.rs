//! JSON encoding of point patterns and distance tables
//!
//! Point set:
//! ```text
//! { "window": { "rectangle": { "min_x": 0, "max_x": 1, "min_y": 0, "max_y": 1 } },
//!   "points": [ { "x": 0.1, "y": 0.2, "type": "Case", "weight": 2.0 }, ... ] }
//! ```
//! A polygonal window is written `{ "polygon": { "vertices": [[x, y], ...] } }`.
//!
//! Distance table:
//! ```text
//! { "marks": [ { "type": "Case", "weight": 2.0 }, ... ],
//!   "distances": [[0.0, 1.0], [1.0, 0.0]] }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::pattern::{DistanceTable, Marks, Point, PointSet, TabulatedPattern, Window};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WindowRecord {
    Rectangle {
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    },
    Polygon {
        vertices: Vec<[f64; 2]>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct PointRecord {
    x: f64,
    y: f64,
    #[serde(rename = "type")]
    label: String,
    weight: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PointSetRecord {
    window: WindowRecord,
    points: Vec<PointRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkRecord {
    #[serde(rename = "type")]
    label: String,
    weight: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct TabulatedRecord {
    marks: Vec<MarkRecord>,
    distances: Vec<Vec<f64>>,
}

impl WindowRecord {
    fn from_window(window: &Window) -> Self {
        match window {
            Window::Rectangle(b) => WindowRecord::Rectangle {
                min_x: b.min_x,
                max_x: b.max_x,
                min_y: b.min_y,
                max_y: b.max_y,
            },
            Window::Polygon(_) => WindowRecord::Polygon {
                vertices: window.vertices().into_iter().map(|(x, y)| [x, y]).collect(),
            },
        }
    }

    fn into_window(self) -> Result<Window> {
        match self {
            WindowRecord::Rectangle {
                min_x,
                max_x,
                min_y,
                max_y,
            } => Window::rectangle(min_x, max_x, min_y, max_y),
            WindowRecord::Polygon { vertices } => {
                let vertices: Vec<(f64, f64)> = vertices.into_iter().map(|[x, y]| (x, y)).collect();
                Window::polygon(&vertices)
            }
        }
    }
}

impl PointSetRecord {
    fn from_point_set(set: &PointSet) -> Self {
        Self {
            window: WindowRecord::from_window(set.window()),
            points: set
                .iter()
                .map(|p| PointRecord {
                    x: p.x,
                    y: p.y,
                    label: p.label,
                    weight: p.weight,
                })
                .collect(),
        }
    }

    fn into_point_set(self) -> Result<PointSet> {
        let window = self.window.into_window()?;
        let points = self
            .points
            .into_iter()
            .map(|p| Point::new(p.x, p.y, p.label, p.weight));
        PointSet::new(window, points)
    }
}

/// Parse a point set from a JSON string
pub fn point_set_from_str(s: &str) -> Result<PointSet> {
    let record: PointSetRecord = serde_json::from_str(s)?;
    record.into_point_set()
}

/// Encode a point set as pretty-printed JSON
pub fn point_set_to_string(set: &PointSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(&PointSetRecord::from_point_set(set))?)
}

/// Read a point set from a JSON file
pub fn read_point_set<P: AsRef<Path>>(path: P) -> Result<PointSet> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let record: PointSetRecord = serde_json::from_reader(reader)?;
    record.into_point_set()
}

/// Write a point set to a JSON file
pub fn write_point_set<P: AsRef<Path>>(set: &PointSet, path: P) -> Result<()> {
    write_json(&PointSetRecord::from_point_set(set), path)
}

/// Parse a distance table and its marks from a JSON string
pub fn tabulated_pattern_from_str(s: &str) -> Result<TabulatedPattern> {
    let record: TabulatedRecord = serde_json::from_str(s)?;
    tabulated_from_record(record)
}

/// Read a distance table and its marks from a JSON file
pub fn read_tabulated_pattern<P: AsRef<Path>>(path: P) -> Result<TabulatedPattern> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let record: TabulatedRecord = serde_json::from_reader(reader)?;
    tabulated_from_record(record)
}

/// Write a distance table and its marks to a JSON file
pub fn write_tabulated_pattern<P: AsRef<Path>>(pattern: &TabulatedPattern, path: P) -> Result<()> {
    let marks = pattern.marks();
    let record = TabulatedRecord {
        marks: (0..marks.len())
            .map(|i| MarkRecord {
                label: marks.label(marks.type_at(i)).to_string(),
                weight: marks.weight_at(i),
            })
            .collect(),
        distances: pattern
            .table()
            .as_array()
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect(),
    };
    write_json(&record, path)
}

/// Serialize any value as pretty-printed JSON into a file
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn tabulated_from_record(record: TabulatedRecord) -> Result<TabulatedPattern> {
    let marks = Marks::new(record.marks.iter().map(|m| (m.label.as_str(), m.weight)))?;
    let table = DistanceTable::from_rows(record.distances)?;
    TabulatedPattern::new(table, marks)
}
