//! Autoregressive forecasting over a trained one-step model.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::scaling::ScaleRange;
use crate::series::Period;

/// A model that predicts the next normalized value from a fixed number of
/// trailing normalized values.
pub trait OneStepModel {
    /// Number of trailing values the model consumes per step.
    fn window(&self) -> usize;

    /// Predict the next normalized value.
    fn next_value(&self, window: &[f64]) -> f64;
}

/// One forecast month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: Period,
    pub amount: f64,
}

/// Lazy, finite autoregressive forecast.
///
/// Each step predicts from the current window of normalized values, emits
/// the denormalized amount clamped to zero, and slides the window forward
/// by appending the raw normalized prediction; the clamped output never
/// feeds back into the model. Periods advance one calendar month per step
/// from the last historical period. The iterator yields exactly the number
/// of points it was built for and cannot be restarted.
pub struct ForecastIter<'a, M: OneStepModel + ?Sized> {
    model: &'a M,
    window: Vec<f64>,
    range: ScaleRange,
    period: Period,
    remaining: usize,
}

/// Start a forecast from the end of a normalized history.
///
/// # Arguments
/// * `model` - trained one-step model
/// * `normalized_history` - the full normalized series; the last
///   `model.window()` values seed the forecast window
/// * `range` - the scale the history was normalized with
/// * `last_period` - period of the final historical observation
/// * `months` - number of points the iterator will yield
pub fn forecast_iter<'a, M: OneStepModel + ?Sized>(
    model: &'a M,
    normalized_history: &[f64],
    range: ScaleRange,
    last_period: Period,
    months: usize,
) -> Result<ForecastIter<'a, M>> {
    let width = model.window();
    if width == 0 {
        return Err(ForecastError::InvalidParameter {
            param: "window".into(),
            value: "0".into(),
            reason: "model must consume at least one value per step".into(),
        });
    }
    if normalized_history.len() < width {
        return Err(ForecastError::InsufficientData {
            needed: width,
            got: normalized_history.len(),
        });
    }

    Ok(ForecastIter {
        model,
        window: normalized_history[normalized_history.len() - width..].to_vec(),
        range,
        period: last_period,
        remaining: months,
    })
}

impl<M: OneStepModel + ?Sized> Iterator for ForecastIter<'_, M> {
    type Item = ForecastPoint;

    fn next(&mut self) -> Option<ForecastPoint> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let predicted = self.model.next_value(&self.window);
        self.period = self.period.next();
        let amount = self.range.denormalize(predicted).max(0.0);

        self.window.remove(0);
        self.window.push(predicted);

        Some(ForecastPoint {
            period: self.period,
            amount,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<M: OneStepModel + ?Sized> ExactSizeIterator for ForecastIter<'_, M> {}
