//! Min-max scaling for count series
//!
//! The scaler is fitted once per request and kept alongside the scaled data so
//! that model output can be mapped back to count units.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Min-max scaler mapping a fitted range onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit the scaler to the observed minimum and maximum of `values`
    ///
    /// Fails with [`MathError::DegenerateRange`] for a constant series, since
    /// the transform would divide by zero.
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(MathError::EmptyInput(
                "Cannot fit a scaler to an empty series".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Series contains non-finite values".to_string(),
            ));
        }

        let min: f64 = Statistics::min(values.iter());
        let max: f64 = Statistics::max(values.iter());

        if max == min {
            return Err(MathError::DegenerateRange { value: min });
        }

        Ok(Self { min, max })
    }

    /// Lower bound of the fitted range
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound of the fitted range
    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Scale a single value. Values outside the fitted range map outside [0, 1].
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    /// Map a scaled value back to original units
    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.min
    }

    /// Scale every value of a series, preserving order
    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }

    /// Inverse-transform every value of a series, preserving order
    pub fn inverse_all(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|&v| self.inverse(v)).collect()
    }
}
