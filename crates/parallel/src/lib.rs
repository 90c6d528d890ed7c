//! # markcorr Parallel
//!
//! Execution strategies for embarrassingly parallel statistics.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential, all cores, or a fixed-size thread pool
//! - `Executor`: a mode bound to its pool, built once per computation
//! - `BatchIterator`: cooperative batching of replicate indices
//! - `CancelToken`: early termination checked between batches

pub mod batch;
pub mod cancel;
pub mod strategy;

pub use batch::BatchIterator;
pub use cancel::CancelToken;
pub use strategy::{num_cpus, Executor, ParallelStrategy, ProcessingMode};
