//! # markcorr Algorithms
//!
//! Distance-based statistics for weighted marked point patterns.
//!
//! ## Available Algorithm Categories
//!
//! - **distance**: coordinate and tabulated distance providers, k-d tree
//! - **statistics**: the M function, confidence envelopes, quantiles
//! - **approximation**: grid aggregation of patterns

pub mod approximation;
pub mod distance;
pub(crate) mod maybe_rayon;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::approximation::grid_approximation;
    pub use crate::distance::{
        distance_provider, CoordinateDistances, DistanceMode, DistanceProvider, TableDistances,
    };
    pub use crate::statistics::{
        m_function, m_function_for, simulate_envelope, simulate_envelope_with_progress, Envelope,
        EnvelopeKind, EnvelopeParams, MParams, MResult, Normalization, NullModel,
    };
    pub use markcorr_core::prelude::*;
    pub use markcorr_parallel::{CancelToken, ProcessingMode};
}
