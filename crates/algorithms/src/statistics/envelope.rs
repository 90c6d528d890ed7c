//! Monte-Carlo confidence envelopes for the M function
//!
//! Marks are repeatedly permuted over the fixed locations according to a
//! [`NullModel`], M is recomputed for every permutation, and the family of
//! simulated curves is reduced to lower/upper bounds:
//!
//! - **Pointwise**: at each radius the `α/2` and `1 − α/2` quantiles of the
//!   simulated values.
//! - **Global**: a single critical deviation `d*`, the `1 − α` quantile of
//!   `max_r |M_sim(r) − 1|`, giving bounds `1 ± d*` at every radius. This
//!   controls the error rate over the whole radius range at once.
//!
//! Replicate `k` draws its permutation from its own generator seeded with
//! [`replicate_seed`], so an envelope depends only on the seed and the
//! number of replicates, never on scheduling or thread count.
//!
//! Reference:
//! Duranton, G. & Overman, H.G. (2005). Testing for localization using
//! micro-geographic data. Review of Economic Studies, 72(4).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use super::mark_correlation::{m_function, MParams};
use super::quantile::{quantile, quantile_sorted};
use crate::distance::DistanceProvider;
use markcorr_core::{Error, Marks, RadiusSequence, Result, TypeCode};
use markcorr_parallel::{BatchIterator, CancelToken, ParallelStrategy, ProcessingMode};

/// How simulated curves are reduced to bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Pointwise,
    Global,
}

impl std::str::FromStr for EnvelopeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pointwise" | "local" => Ok(EnvelopeKind::Pointwise),
            "global" => Ok(EnvelopeKind::Global),
            _ => Err(Error::InvalidParameter {
                name: "envelope",
                value: s.to_string(),
                reason: "expected 'pointwise' or 'global'".into(),
            }),
        }
    }
}

/// Null hypothesis the permutations are drawn under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullModel {
    /// Types are permuted over the points; every location keeps its weight.
    #[default]
    RandomLabeling,
    /// `(type, weight)` pairs are permuted jointly over the locations.
    RandomLocation,
    /// Reference-type points stay fixed; the marks of all other points are
    /// permuted among the other locations.
    PopulationIndependence,
}

impl std::str::FromStr for NullModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "random-labeling" | "labeling" | "rl" => Ok(NullModel::RandomLabeling),
            "random-location" | "location" => Ok(NullModel::RandomLocation),
            "population-independence" | "independence" | "pi" => Ok(NullModel::PopulationIndependence),
            _ => Err(Error::InvalidParameter {
                name: "null-model",
                value: s.to_string(),
                reason: "expected 'random-labeling', 'random-location' or 'population-independence'"
                    .into(),
            }),
        }
    }
}

/// Parameters for envelope simulation
#[derive(Debug, Clone)]
pub struct EnvelopeParams {
    pub kind: EnvelopeKind,
    /// Number of replicates (> 0)
    pub simulations: usize,
    /// Risk level, in (0, 1)
    pub alpha: f64,
    /// Base seed; replicate seeds are derived from it
    pub seed: u64,
    pub null_model: NullModel,
    /// Threads for the observed M and every replicate
    pub mode: ProcessingMode,
    /// Replicates dispatched between two cancellation checks
    pub batch_size: usize,
    pub cancel: Option<CancelToken>,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            kind: EnvelopeKind::Pointwise,
            simulations: 100,
            alpha: 0.05,
            seed: 42,
            null_model: NullModel::RandomLabeling,
            mode: ProcessingMode::Parallel,
            batch_size: 32,
            cancel: None,
        }
    }
}

/// One row of an envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvelopeRecord {
    pub radius: f64,
    pub observed: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Observed M with simulated bounds at every radius
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub alpha: f64,
    pub null_model: NullModel,
    pub radii: RadiusSequence,
    pub observed: Vec<Option<f64>>,
    /// `None` at radii where no replicate produced a value
    pub lower: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    /// `d*` for global envelopes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_deviation: Option<f64>,
    pub simulations_requested: usize,
    pub simulations_completed: usize,
}

impl Envelope {
    /// Ordered `(radius, observed, lower, upper)` records
    pub fn records(&self) -> Vec<EnvelopeRecord> {
        self.radii
            .iter()
            .enumerate()
            .map(|(k, &radius)| EnvelopeRecord {
                radius,
                observed: self.observed[k],
                lower: self.lower[k],
                upper: self.upper[k],
            })
            .collect()
    }

    /// True if cancellation stopped the simulation early
    pub fn is_partial(&self) -> bool {
        self.simulations_completed < self.simulations_requested
    }

    /// `upper − lower` at radius index `k`
    pub fn width(&self, k: usize) -> Option<f64> {
        Some((*self.upper.get(k)?)? - (*self.lower.get(k)?)?)
    }
}

/// Seed of replicate `k`: a SplitMix64 mix of the base seed and the index.
pub fn replicate_seed(seed: u64, replicate: usize) -> u64 {
    let mut z = seed.wrapping_add((replicate as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Simulate a confidence envelope of M.
///
/// # Arguments
/// * `distances` - Distances between the points described by `marks`
/// * `marks` - Observed types and weights
/// * `radii` - Radii at which M is evaluated
/// * `m_params` - Reference/neighbor types and normalization
/// * `params` - Envelope kind, replicate count, seed and execution mode
pub fn simulate_envelope<D>(
    distances: &D,
    marks: &Marks,
    radii: &RadiusSequence,
    m_params: &MParams,
    params: &EnvelopeParams,
) -> Result<Envelope>
where
    D: DistanceProvider + ?Sized,
{
    simulate_envelope_with_progress(distances, marks, radii, m_params, params, |_, _| {})
}

/// Like [`simulate_envelope`], calling `progress(completed, requested)`
/// after every batch of replicates.
///
/// If the cancel token is set, the envelope is built from the replicates
/// completed so far; [`Error::Cancelled`] is returned only when none were.
pub fn simulate_envelope_with_progress<D, P>(
    distances: &D,
    marks: &Marks,
    radii: &RadiusSequence,
    m_params: &MParams,
    params: &EnvelopeParams,
    mut progress: P,
) -> Result<Envelope>
where
    D: DistanceProvider + ?Sized,
    P: FnMut(usize, usize),
{
    check_params(params)?;

    let m_params = MParams {
        individual: false,
        ..m_params.clone()
    };
    let executor = params.mode.executor()?;
    let observed = executor.install(|| m_function(distances, marks, radii, &m_params))?;

    let reference = marks.require(&m_params.reference)?;
    let movable = movable_points(marks, params.null_model, reference);

    info!(
        simulations = params.simulations,
        null_model = ?params.null_model,
        kind = ?params.kind,
        "simulating envelope"
    );

    let mut simulations: Vec<Vec<Option<f64>>> = Vec::with_capacity(params.simulations);
    for batch in BatchIterator::new(params.simulations, params.batch_size) {
        if params.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            info!(
                completed = simulations.len(),
                requested = params.simulations,
                "envelope simulation cancelled"
            );
            break;
        }

        let values = executor.try_par_map(batch.clone(), |k| {
            let mut rng = StdRng::seed_from_u64(replicate_seed(params.seed, k));
            let permuted = permute_marks(marks, params.null_model, &movable, &mut rng);
            Ok(m_function(distances, &permuted, radii, &m_params)?.values)
        })?;
        simulations.extend(values);

        debug!(batch = ?batch, completed = simulations.len(), "replicate batch done");
        progress(simulations.len(), params.simulations);
    }

    if simulations.is_empty() {
        return Err(Error::Cancelled);
    }

    let (lower, upper, critical_deviation) = match params.kind {
        EnvelopeKind::Pointwise => {
            let (lower, upper) = pointwise_bounds(&simulations, radii.len(), params.alpha);
            (lower, upper, None)
        }
        EnvelopeKind::Global => {
            let (lower, upper, d) = global_bounds(&simulations, radii.len(), params.alpha);
            (lower, upper, d)
        }
    };

    Ok(Envelope {
        kind: params.kind,
        alpha: params.alpha,
        null_model: params.null_model,
        radii: radii.clone(),
        observed: observed.values,
        lower,
        upper,
        critical_deviation,
        simulations_requested: params.simulations,
        simulations_completed: simulations.len(),
    })
}

fn check_params(params: &EnvelopeParams) -> Result<()> {
    if params.simulations == 0 {
        return Err(Error::InvalidParameter {
            name: "simulations",
            value: "0".into(),
            reason: "at least one simulation is required".into(),
        });
    }
    if !(params.alpha > 0.0 && params.alpha < 1.0) {
        return Err(Error::InvalidParameter {
            name: "alpha",
            value: params.alpha.to_string(),
            reason: "must lie strictly between 0 and 1".into(),
        });
    }
    Ok(())
}

/// Indices whose marks are shuffled under `model`
fn movable_points(marks: &Marks, model: NullModel, reference: TypeCode) -> Vec<usize> {
    match model {
        NullModel::PopulationIndependence => (0..marks.len())
            .filter(|&i| marks.type_at(i) != reference)
            .collect(),
        NullModel::RandomLabeling | NullModel::RandomLocation => (0..marks.len()).collect(),
    }
}

/// Draw one permutation of the marks over the fixed locations
fn permute_marks<R: Rng + ?Sized>(marks: &Marks, model: NullModel, movable: &[usize], rng: &mut R) -> Marks {
    let mut order: Vec<usize> = (0..marks.len()).collect();
    let mut shuffled = movable.to_vec();
    shuffled.shuffle(rng);
    for (&dst, &src) in movable.iter().zip(&shuffled) {
        order[dst] = src;
    }
    marks.reassigned(&order, model != NullModel::RandomLabeling)
}

/// Sorted defined values of every simulation at radius index `k`
fn column(simulations: &[Vec<Option<f64>>], k: usize) -> Vec<f64> {
    let mut values: Vec<f64> = simulations.iter().filter_map(|s| s[k]).collect();
    values.sort_unstable_by(f64::total_cmp);
    values
}

/// Per-radius `α/2` and `1 − α/2` quantiles of the simulated values.
pub fn pointwise_bounds(
    simulations: &[Vec<Option<f64>>],
    n_radii: usize,
    alpha: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    (0..n_radii)
        .map(|k| {
            let values = column(simulations, k);
            (
                quantile_sorted(&values, alpha / 2.0),
                quantile_sorted(&values, 1.0 - alpha / 2.0),
            )
        })
        .unzip()
}

/// Global bounds `1 ± d*` and the critical deviation `d*`.
///
/// `d*` is the `1 − α` quantile of each simulation's largest deviation from
/// 1, raised when needed to half the widest pointwise band so the global
/// envelope is never narrower than the pointwise one. Bounds are `None` at
/// radii where no simulation is defined.
pub fn global_bounds(
    simulations: &[Vec<Option<f64>>],
    n_radii: usize,
    alpha: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Option<f64>) {
    let deviations: Vec<f64> = simulations
        .iter()
        .filter_map(|s| s.iter().flatten().map(|v| (v - 1.0).abs()).reduce(f64::max))
        .collect();

    let Some(critical) = quantile(&deviations, 1.0 - alpha) else {
        return (vec![None; n_radii], vec![None; n_radii], None);
    };

    let (lower, upper) = pointwise_bounds(simulations, n_radii, alpha);
    let widest = lower
        .iter()
        .zip(&upper)
        .filter_map(|(lo, hi)| Some(hi.as_ref()? - lo.as_ref()?))
        .fold(0.0, f64::max);
    let d = critical.max(widest / 2.0);

    let (lower, upper): (Vec<_>, Vec<_>) = lower
        .iter()
        .map(|lo| match lo {
            Some(_) => (Some(1.0 - d), Some(1.0 + d)),
            None => (None, None),
        })
        .unzip();
    (lower, upper, Some(d))
}
