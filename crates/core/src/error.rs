//! Error types for markcorr

use thiserror::Error;

/// Main error type for markcorr operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Point {index} at ({x}, {y}) lies outside the window")]
    PointOutsideWindow { index: usize, x: f64, y: f64 },

    #[error("Invalid weight for point {index}: {weight} (weights must be finite and > 0)")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("Invalid radius sequence: {0}")]
    InvalidRadiusSequence(String),

    #[error("Point type '{0}' is not present in the pattern")]
    MissingType(String),

    #[error("Empty neighborhood at radius {radius}: M is undefined")]
    EmptyNeighborhood { radius: f64 },

    #[error("Invalid grid partitions: {0} (must be > 0)")]
    InvalidPartitions(usize),

    #[error("Inconsistent representations: distance table is {table}x{table} but {marks} marks were given")]
    InconsistentRepresentations { table: usize, marks: usize },

    #[error("Invalid distance table: {0}")]
    InvalidDistanceTable(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Simulation cancelled before any replicate completed")]
    Cancelled,

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for markcorr operations
pub type Result<T> = std::result::Result<T, Error>;
