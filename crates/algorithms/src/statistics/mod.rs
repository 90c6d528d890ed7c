//! Statistics on marked point patterns
//!
//! - **mark_correlation**: the weighted M function
//! - **envelope**: Monte-Carlo confidence envelopes under a null model
//! - **quantile**: empirical quantiles used by the envelopes

pub mod envelope;
pub mod mark_correlation;
pub mod quantile;

pub use envelope::{
    global_bounds, pointwise_bounds, replicate_seed, simulate_envelope, simulate_envelope_with_progress,
    Envelope, EnvelopeKind, EnvelopeParams, EnvelopeRecord, NullModel,
};
pub use mark_correlation::{
    m_function, m_function_for, IndividualValues, MParams, MRecord, MResult, Normalization,
};
pub use quantile::{quantile, quantile_sorted};
