//! Min-max scaling of series to the unit interval.

use serde::{Deserialize, Serialize};

/// The `(min, max)` range used to scale a series into `[0, 1]`.
///
/// Kept alongside any normalized data so predictions can be mapped back to
/// the original scale. A constant series has `min == max`; the scale span
/// then defaults to 1 so neither direction divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl ScaleRange {
    /// Fit a range to the given values. Empty input yields the degenerate
    /// `[0, 0]` range, which normalizes everything to 0.
    pub fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min.is_finite() && max.is_finite() {
            ScaleRange { min, max }
        } else {
            ScaleRange { min: 0.0, max: 0.0 }
        }
    }

    /// The scale denominator: `max - min`, or 1 when the range is degenerate.
    fn span(&self) -> f64 {
        if self.max > self.min {
            self.max - self.min
        } else {
            1.0
        }
    }

    /// Map a value from the original scale into `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / self.span()
    }

    /// Map a normalized value back to the original scale.
    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.span() + self.min
    }

    /// Normalize a whole series.
    pub fn normalize_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.normalize(v)).collect()
    }
}
