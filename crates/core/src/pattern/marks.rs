//! Point marks: a categorical type and a positive weight per point

use crate::error::{Error, Result};

/// Compact code of a point type within one [`Marks`] label domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCode(pub u32);

impl TypeCode {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Count and total weight of one type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSummary {
    pub label: String,
    pub count: usize,
    pub weight: f64,
}

/// The ordered `(type, weight)` list of a pattern.
///
/// Types are stored as [`TypeCode`]s into a label domain kept in order of
/// first appearance, so two marks built from the same sequence always get
/// the same codes. Every weight is finite and strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Marks {
    labels: Vec<String>,
    types: Vec<TypeCode>,
    weights: Vec<f64>,
}

impl Marks {
    /// Build marks from `(label, weight)` pairs.
    pub fn new<S, I>(pairs: I) -> Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let mut labels: Vec<String> = Vec::new();
        let mut types = Vec::new();
        let mut weights = Vec::new();

        for (index, (label, weight)) in pairs.into_iter().enumerate() {
            check_weight(index, weight)?;
            let label = label.as_ref();
            let code = match labels.iter().position(|l| l == label) {
                Some(pos) => pos,
                None => {
                    labels.push(label.to_string());
                    labels.len() - 1
                }
            };
            types.push(TypeCode(code as u32));
            weights.push(weight);
        }

        Ok(Self {
            labels,
            types,
            weights,
        })
    }

    /// Build marks from codes into an existing label domain.
    pub fn from_codes(labels: Vec<String>, types: Vec<TypeCode>, weights: Vec<f64>) -> Result<Self> {
        if types.len() != weights.len() {
            return Err(Error::Algorithm(format!(
                "{} types but {} weights",
                types.len(),
                weights.len()
            )));
        }
        if let Some(code) = types.iter().find(|c| c.index() >= labels.len()) {
            return Err(Error::Algorithm(format!(
                "type code {} outside a domain of {} labels",
                code.0,
                labels.len()
            )));
        }
        for (index, &weight) in weights.iter().enumerate() {
            check_weight(index, weight)?;
        }
        Ok(Self {
            labels,
            types,
            weights,
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Label domain, in order of first appearance
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn types(&self) -> &[TypeCode] {
        &self.types
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn type_at(&self, i: usize) -> TypeCode {
        self.types[i]
    }

    #[inline]
    pub fn weight_at(&self, i: usize) -> f64 {
        self.weights[i]
    }

    /// Label of a type code
    pub fn label(&self, code: TypeCode) -> &str {
        &self.labels[code.index()]
    }

    /// Code of a label, if the label is part of the domain
    pub fn code_of(&self, label: &str) -> Option<TypeCode> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|pos| TypeCode(pos as u32))
    }

    /// Code of a label that must be carried by at least one point.
    pub fn require(&self, label: &str) -> Result<TypeCode> {
        let code = self
            .code_of(label)
            .ok_or_else(|| Error::MissingType(label.to_string()))?;
        if !self.types.contains(&code) {
            return Err(Error::MissingType(label.to_string()));
        }
        Ok(code)
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Total weight of the points carrying `code`
    pub fn weight_of(&self, code: TypeCode) -> f64 {
        self.types
            .iter()
            .zip(&self.weights)
            .filter(|(t, _)| **t == code)
            .map(|(_, w)| w)
            .sum()
    }

    /// Number of points carrying `code`
    pub fn count_of(&self, code: TypeCode) -> usize {
        self.types.iter().filter(|t| **t == code).count()
    }

    /// Per-type counts and weights, in label-domain order
    pub fn summary(&self) -> Vec<TypeSummary> {
        let mut out: Vec<TypeSummary> = self
            .labels
            .iter()
            .map(|label| TypeSummary {
                label: label.clone(),
                count: 0,
                weight: 0.0,
            })
            .collect();
        for (t, w) in self.types.iter().zip(&self.weights) {
            let s = &mut out[t.index()];
            s.count += 1;
            s.weight += w;
        }
        out
    }

    /// New marks where point `i` takes the type of point `order[i]`.
    ///
    /// With `carry_weights` the weight moves along with the type, otherwise
    /// every point keeps its own weight. `order` must be a permutation of
    /// `0..len`.
    pub fn reassigned(&self, order: &[usize], carry_weights: bool) -> Marks {
        debug_assert_eq!(order.len(), self.len());
        let types = order.iter().map(|&src| self.types[src]).collect();
        let weights = if carry_weights {
            order.iter().map(|&src| self.weights[src]).collect()
        } else {
            self.weights.clone()
        };
        Marks {
            labels: self.labels.clone(),
            types,
            weights,
        }
    }
}

fn check_weight(index: usize, weight: f64) -> Result<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::InvalidWeight { index, weight });
    }
    Ok(())
}
