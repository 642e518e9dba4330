//! Min-max scaling onto the unit interval
//!
//! A [`MinMaxScaler`] is fit once on the full series and then reused for every
//! forward and inverse transform of that run. Values outside the fitted range
//! map outside `[0, 1]` and back again without loss.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Fitted min-max bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit the scaler on the full value range of `values`
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a scaler on an empty series".to_string(),
            ));
        }

        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(format!(
                "Cannot fit a scaler on non-finite value {}",
                bad
            )));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self { min, max })
    }

    /// Lower bound seen during fitting
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound seen during fitting
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether the fitted series was constant
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Map a raw value into normalized space.
    ///
    /// A constant fitted series maps every input to 0.
    pub fn transform(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        (value - self.min) / (self.max - self.min)
    }

    /// Map a normalized value back into raw units
    pub fn inverse(&self, value: f64) -> f64 {
        value * (self.max - self.min) + self.min
    }

    /// Transform every element of a slice
    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }

    /// Inverse-transform every element of a slice
    pub fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.inverse(v)).collect()
    }
}
