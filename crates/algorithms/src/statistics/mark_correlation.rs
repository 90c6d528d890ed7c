//! Weighted mark-correlation function M
//!
//! For every point `i` of the reference type and every radius `r`, the local
//! share of neighbor-type weight among the points within `r` of `i` is
//! compared to the share of neighbor-type weight in the whole pattern:
//! ```text
//! p(i, r) = Σ_{j≠i, d(i,j)≤r, type(j)=N} w_j / Σ_{j≠i, d(i,j)≤r} w_j
//! M(r)    = Σ_i w_i · p(i, r) / P_i  /  Σ_i w_i
//! ```
//! where both sums over `i` run over reference points whose neighborhood at
//! `r` carries some weight. `P_i` is the global neighbor share seen from
//! `i` (see [`Normalization`]). M = 1 when labels carry no spatial
//! structure, M > 1 signals attraction of the neighbor type around the
//! reference type and M < 1 repulsion.
//!
//! Distances are computed once per pair: each reference point collects its
//! neighbors up to the largest radius, sorts them by distance and sweeps
//! every radius in a single pass.
//!
//! Reference:
//! Marcon, E. & Puech, F. (2017). A typology of distance-based measures of
//! spatial concentration. Regional Science and Urban Economics, 62.

use ndarray::Array2;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::distance::{distance_provider, DistanceMode, DistanceProvider};
use crate::maybe_rayon::*;
use markcorr_core::{Error, Marks, PointSet, RadiusSequence, Result, TypeCode};

/// Reference points handled per parallel task. Chunk sums are reduced in
/// chunk order, so results do not depend on the number of threads.
const CHUNK_SIZE: usize = 64;

/// Definition of the global neighbor share `P_i` for reference point `i`
/// with weight `w_i`, given total weight `W` and neighbor-type weight `W_N`.
/// `δ_i` is 1 when reference and neighbor types coincide, 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// `P_i = (W_N − δ_i·w_i) / (W − δ_i·w_i)`: the pattern-wide neighbor
    /// share, leaving out the point itself only when it is a neighbor.
    #[default]
    PatternShare,
    /// `P_i = (W_N − δ_i·w_i) / (W − w_i)`: the neighbor share among all
    /// other points.
    ExcludeSelf,
}

impl std::str::FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pattern-share" | "pattern" | "global" => Ok(Normalization::PatternShare),
            "exclude-self" | "self" => Ok(Normalization::ExcludeSelf),
            _ => Err(Error::InvalidParameter {
                name: "normalization",
                value: s.to_string(),
                reason: "expected 'pattern-share' or 'exclude-self'".into(),
            }),
        }
    }
}

/// Parameters for the M function
#[derive(Debug, Clone)]
pub struct MParams {
    /// Type of the points around which neighbors are counted
    pub reference: String,
    /// Type whose concentration is measured (may equal `reference`)
    pub neighbor: String,
    pub normalization: Normalization,
    /// Also return the per-reference-point values
    pub individual: bool,
}

impl MParams {
    pub fn new(reference: impl Into<String>, neighbor: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            neighbor: neighbor.into(),
            ..Self::default()
        }
    }
}

impl Default for MParams {
    fn default() -> Self {
        Self {
            reference: "Case".into(),
            neighbor: "Control".into(),
            normalization: Normalization::PatternShare,
            individual: false,
        }
    }
}

/// One row of an M result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MRecord {
    pub radius: f64,
    /// `None` where every reference neighborhood is empty
    pub value: Option<f64>,
    /// Value under the null hypothesis
    pub theo: f64,
}

/// Per-reference-point values `p(i, r) / P_i`.
///
/// Row `k` belongs to point `points[k]`; columns follow the radii.
#[derive(Debug, Clone)]
pub struct IndividualValues {
    pub points: Vec<usize>,
    pub values: Array2<Option<f64>>,
}

impl Serialize for IndividualValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rows: Vec<Vec<Option<f64>>> = self.values.rows().into_iter().map(|r| r.to_vec()).collect();
        let mut s = serializer.serialize_struct("IndividualValues", 2)?;
        s.serialize_field("points", &self.points)?;
        s.serialize_field("values", &rows)?;
        s.end()
    }
}

/// M evaluated at every radius of a sequence
#[derive(Debug, Clone, Serialize)]
pub struct MResult {
    pub reference: String,
    pub neighbor: String,
    pub normalization: Normalization,
    pub radii: RadiusSequence,
    /// M(r) per radius, `None` where undefined
    pub values: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual: Option<IndividualValues>,
}

impl MResult {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at radius index `k`, or [`Error::EmptyNeighborhood`] if M is
    /// undefined there.
    pub fn value_at(&self, k: usize) -> Result<f64> {
        let value = self.values.get(k).ok_or_else(|| Error::InvalidParameter {
            name: "radius index",
            value: k.to_string(),
            reason: format!("only {} radii were evaluated", self.values.len()),
        })?;
        value.ok_or(Error::EmptyNeighborhood {
            radius: self.radii[k],
        })
    }

    /// Ordered `(radius, value)` records
    pub fn records(&self) -> Vec<MRecord> {
        self.radii
            .iter()
            .zip(&self.values)
            .map(|(&radius, &value)| MRecord {
                radius,
                value,
                theo: 1.0,
            })
            .collect()
    }

    /// Largest absolute difference to another result over the radii where
    /// both are defined. Both results must share the same radii.
    pub fn max_abs_difference(&self, other: &MResult) -> Result<Option<f64>> {
        if self.radii != other.radii {
            return Err(Error::InvalidParameter {
                name: "radii",
                value: format!("{} vs {} radii", self.radii.len(), other.radii.len()),
                reason: "results must be evaluated at the same radii".into(),
            });
        }
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .filter_map(|(a, b)| Some((a.as_ref()? - b.as_ref()?).abs()))
            .reduce(f64::max))
    }
}

/// Weight totals shared by every reference point
struct Totals {
    reference: TypeCode,
    neighbor: TypeCode,
    total_weight: f64,
    neighbor_weight: f64,
    normalization: Normalization,
}

impl Totals {
    /// Global neighbor share seen from a reference point of weight `w_i`,
    /// `None` if no other neighbor-type weight exists.
    fn share(&self, w_i: f64) -> Option<f64> {
        let self_is_neighbor = self.reference == self.neighbor;
        let neighbor_weight = if self_is_neighbor {
            self.neighbor_weight - w_i
        } else {
            self.neighbor_weight
        };
        let total_weight = match self.normalization {
            Normalization::PatternShare if !self_is_neighbor => self.total_weight,
            _ => self.total_weight - w_i,
        };
        let share = neighbor_weight / total_weight;
        (share.is_finite() && share > 0.0).then_some(share)
    }
}

/// Partial sums over one chunk of reference points
struct ChunkSums {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    /// Row-major individual values, filled only when requested
    individual: Vec<Option<f64>>,
}

/// Compute M at every radius.
///
/// # Arguments
/// * `distances` - Distances between the points described by `marks`
/// * `marks` - Type and weight of every point, in provider order
/// * `radii` - Radii at which M is evaluated
/// * `params` - Reference/neighbor types and normalization
///
/// # Returns
/// [`MResult`] with one value per radius; radii at which every reference
/// neighborhood is empty are `None`.
pub fn m_function<D>(
    distances: &D,
    marks: &Marks,
    radii: &RadiusSequence,
    params: &MParams,
) -> Result<MResult>
where
    D: DistanceProvider + ?Sized,
{
    if distances.len() != marks.len() {
        return Err(Error::InconsistentRepresentations {
            table: distances.len(),
            marks: marks.len(),
        });
    }

    let reference = marks.require(&params.reference)?;
    let neighbor = marks.require(&params.neighbor)?;
    let totals = Totals {
        reference,
        neighbor,
        total_weight: marks.total_weight(),
        neighbor_weight: marks.weight_of(neighbor),
        normalization: params.normalization,
    };

    let references: Vec<usize> = (0..marks.len())
        .filter(|&i| marks.type_at(i) == reference)
        .collect();
    let n_radii = radii.len();

    debug!(
        points = marks.len(),
        references = references.len(),
        radii = n_radii,
        "computing M"
    );

    let n_chunks = references.len().div_ceil(CHUNK_SIZE);
    let chunks: Vec<ChunkSums> = (0..n_chunks)
        .into_par_iter()
        .map(|c| {
            let start = c * CHUNK_SIZE;
            let end = (start + CHUNK_SIZE).min(references.len());
            accumulate_chunk(distances, marks, radii, &totals, &references[start..end], params.individual)
        })
        .collect();

    let mut numerator = vec![0.0; n_radii];
    let mut denominator = vec![0.0; n_radii];
    let mut individual = Vec::new();
    for chunk in chunks {
        for k in 0..n_radii {
            numerator[k] += chunk.numerator[k];
            denominator[k] += chunk.denominator[k];
        }
        individual.extend(chunk.individual);
    }

    let values = numerator
        .iter()
        .zip(&denominator)
        .map(|(&num, &den)| (den > 0.0).then(|| num / den))
        .collect();

    let individual = if params.individual {
        let values = Array2::from_shape_vec((references.len(), n_radii), individual)
            .map_err(|e| Error::Algorithm(e.to_string()))?;
        Some(IndividualValues {
            points: references,
            values,
        })
    } else {
        None
    };

    Ok(MResult {
        reference: params.reference.clone(),
        neighbor: params.neighbor.clone(),
        normalization: params.normalization,
        radii: radii.clone(),
        values,
        individual,
    })
}

/// Compute M for a located pattern, with distances obtained per `mode`.
pub fn m_function_for(
    points: &PointSet,
    mode: DistanceMode,
    radii: &RadiusSequence,
    params: &MParams,
) -> Result<MResult> {
    let provider = distance_provider(points, mode);
    m_function(provider.as_ref(), points.marks(), radii, params)
}

fn accumulate_chunk<D>(
    distances: &D,
    marks: &Marks,
    radii: &RadiusSequence,
    totals: &Totals,
    references: &[usize],
    keep_individual: bool,
) -> ChunkSums
where
    D: DistanceProvider + ?Sized,
{
    let n_radii = radii.len();
    let mut sums = ChunkSums {
        numerator: vec![0.0; n_radii],
        denominator: vec![0.0; n_radii],
        individual: Vec::with_capacity(if keep_individual { references.len() * n_radii } else { 0 }),
    };
    let mut neighbors = Vec::new();
    let mut ratios = vec![None; n_radii];

    for &i in references {
        let w_i = marks.weight_at(i);
        ratios.fill(None);

        if let Some(share) = totals.share(w_i) {
            neighbors.clear();
            distances.neighbors_within(i, radii.max(), &mut neighbors);
            local_ratios(&mut neighbors, marks, totals.neighbor, radii, share, &mut ratios);

            for (k, ratio) in ratios.iter().enumerate() {
                if let Some(ratio) = ratio {
                    sums.numerator[k] += w_i * ratio;
                    sums.denominator[k] += w_i;
                }
            }
        }

        if keep_individual {
            sums.individual.extend_from_slice(&ratios);
        }
    }

    sums
}

/// Sweep the radii over the neighbors of one reference point sorted by
/// distance, writing `p(i, r) / share` or `None` for an empty neighborhood.
fn local_ratios(
    neighbors: &mut [(usize, f64)],
    marks: &Marks,
    neighbor_type: TypeCode,
    radii: &RadiusSequence,
    share: f64,
    out: &mut [Option<f64>],
) {
    // Index tie-break keeps the summation order independent of the provider
    neighbors.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut next = 0;
    let mut local_total = 0.0;
    let mut local_neighbor = 0.0;
    for (k, &r) in radii.iter().enumerate() {
        while next < neighbors.len() && neighbors[next].1 <= r {
            let j = neighbors[next].0;
            let w = marks.weight_at(j);
            local_total += w;
            if marks.type_at(j) == neighbor_type {
                local_neighbor += w;
            }
            next += 1;
        }
        out[k] = (local_total > 0.0).then(|| local_neighbor / local_total / share);
    }
}
