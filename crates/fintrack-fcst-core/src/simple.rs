//! Simple predictor: a one-step regressor retrained from scratch on every
//! call, for histories too short to window.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::forecast::OneStepModel;
use crate::nn::FeedForwardNet;
use crate::windowing::sliding_windows;

/// Training hyperparameters for the simple model.
#[derive(Debug, Clone)]
pub struct SimpleTrainConfig {
    /// Hidden layer width.
    pub hidden: usize,
    /// Upper bound on training iterations.
    pub max_iterations: usize,
    /// Stop early once the epoch mean squared error drops below this.
    pub error_threshold: f64,
    pub learning_rate: f64,
}

impl Default for SimpleTrainConfig {
    fn default() -> Self {
        SimpleTrainConfig {
            hidden: 4,
            max_iterations: 1000,
            error_threshold: 0.005,
            learning_rate: 0.3,
        }
    }
}

impl SimpleTrainConfig {
    fn validate(&self) -> Result<()> {
        let invalid = |param: &str, value: String, reason: &str| ForecastError::InvalidParameter {
            param: param.into(),
            value,
            reason: reason.into(),
        };

        if self.hidden == 0 {
            return Err(invalid("hidden", self.hidden.to_string(), "must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(invalid(
                "max_iterations",
                self.max_iterations.to_string(),
                "must be at least 1",
            ));
        }
        if self.error_threshold <= 0.0 {
            return Err(invalid(
                "error_threshold",
                self.error_threshold.to_string(),
                "must be positive",
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(invalid(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// A trained one-step model. Never persisted; lives for a single call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleModel {
    net: FeedForwardNet,
    /// Iterations actually run before the threshold stop.
    pub iterations: usize,
    /// Mean squared error of the final iteration.
    pub train_error: f64,
}

impl OneStepModel for SimpleModel {
    fn window(&self) -> usize {
        1
    }

    fn next_value(&self, window: &[f64]) -> f64 {
        self.net.predict(window)
    }
}

/// Train a one-step model on a normalized series.
///
/// Builds the `(value[i], value[i+1])` pairs and runs full-batch gradient
/// descent until the error threshold or the iteration cap is reached.
/// Needs at least two historical points to form a single pair.
pub fn train_simple_model(
    normalized: &[f64],
    config: &SimpleTrainConfig,
    rng: &mut impl Rng,
) -> Result<SimpleModel> {
    config.validate()?;
    if normalized.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: normalized.len(),
        });
    }

    let pairs = sliding_windows(normalized, 1);
    let refs: Vec<_> = pairs.iter().collect();

    let mut net = FeedForwardNet::new(1, config.hidden, rng);
    let mut iterations = 0;
    let mut error = f64::INFINITY;

    for _ in 0..config.max_iterations {
        error = net.train_step(&refs, config.learning_rate)? / pairs.len() as f64;
        iterations += 1;
        if error < config.error_threshold {
            debug!(iterations, mse = error, "simple training stopped early");
            break;
        }
    }

    if !error.is_finite() {
        return Err(ForecastError::ComputationError(format!(
            "simple training diverged: final error {error}"
        )));
    }

    Ok(SimpleModel {
        net,
        iterations,
        train_error: error,
    })
}
