//! Radius sequences at which M is evaluated

use serde::Serialize;

use crate::error::{Error, Result};
use crate::pattern::Window;

/// Number of steps used by [`RadiusSequence::default_for`]
pub const DEFAULT_RADIUS_STEPS: usize = 64;

/// A non-empty, strictly increasing sequence of finite, non-negative radii.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RadiusSequence(Vec<f64>);

impl RadiusSequence {
    pub fn new(radii: Vec<f64>) -> Result<Self> {
        if radii.is_empty() {
            return Err(Error::InvalidRadiusSequence("sequence is empty".into()));
        }
        if let Some(r) = radii.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(Error::InvalidRadiusSequence(format!(
                "radius {r} is negative or not finite"
            )));
        }
        if let Some(w) = radii.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::InvalidRadiusSequence(format!(
                "radii must be strictly increasing, got {} then {}",
                w[0], w[1]
            )));
        }
        Ok(Self(radii))
    }

    /// `steps + 1` equally spaced radii from 0 to `rmax`
    pub fn linear(rmax: f64, steps: usize) -> Result<Self> {
        if !rmax.is_finite() || rmax <= 0.0 {
            return Err(Error::InvalidRadiusSequence(format!(
                "rmax must be finite and > 0, got {rmax}"
            )));
        }
        if steps == 0 {
            return Err(Error::InvalidRadiusSequence("steps must be > 0".into()));
        }
        let radii = (0..=steps)
            .map(|k| rmax * k as f64 / steps as f64)
            .collect();
        Self::new(radii)
    }

    /// Radii from 0 to a quarter of the shorter side of the window's
    /// bounding box.
    pub fn default_for(window: &Window) -> Result<Self> {
        let b = window.bounds();
        Self::linear(b.width().min(b.height()) / 4.0, DEFAULT_RADIUS_STEPS)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Largest radius
    pub fn max(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for RadiusSequence {
    type Output = f64;

    fn index(&self, k: usize) -> &f64 {
        &self.0[k]
    }
}

impl TryFrom<Vec<f64>> for RadiusSequence {
    type Error = Error;

    fn try_from(radii: Vec<f64>) -> Result<Self> {
        Self::new(radii)
    }
}
