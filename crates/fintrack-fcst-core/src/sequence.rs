//! Sequence predictor: a windowed regressor whose weights persist as a
//! model artifact between calls.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::forecast::OneStepModel;
use crate::nn::FeedForwardNet;
use crate::windowing::{WindowedSample, SEQUENCE_WINDOW};

/// Training hyperparameters for the sequence model.
#[derive(Debug, Clone)]
pub struct SequenceTrainConfig {
    /// Input window width.
    pub window: usize,
    /// Hidden layer width.
    pub hidden: usize,
    /// Number of passes over the training samples.
    pub epochs: usize,
    /// Minibatch size; the final batch of an epoch may be smaller.
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for SequenceTrainConfig {
    fn default() -> Self {
        SequenceTrainConfig {
            window: SEQUENCE_WINDOW,
            hidden: 8,
            epochs: 100,
            batch_size: 4,
            learning_rate: 0.3,
        }
    }
}

impl SequenceTrainConfig {
    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(invalid("window", self.window.to_string(), "must be at least 1"));
        }
        if self.hidden == 0 {
            return Err(invalid("hidden", self.hidden.to_string(), "must be at least 1"));
        }
        if self.epochs == 0 {
            return Err(invalid("epochs", self.epochs.to_string(), "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(invalid(
                "batch_size",
                self.batch_size.to_string(),
                "must be at least 1",
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

fn invalid(param: &str, value: String, reason: &str) -> ForecastError {
    ForecastError::InvalidParameter {
        param: param.into(),
        value,
        reason: reason.into(),
    }
}

/// A trained sequence model. Serializable as the persisted artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceModel {
    net: FeedForwardNet,
    /// Mean squared error of the final training epoch.
    pub train_error: f64,
}

impl OneStepModel for SequenceModel {
    fn window(&self) -> usize {
        self.net.input_size()
    }

    fn next_value(&self, window: &[f64]) -> f64 {
        self.net.predict(window)
    }
}

/// Train a sequence model on windowed samples.
///
/// Runs `epochs` passes of minibatch gradient descent over the samples,
/// reshuffling the sample order each epoch. Samples must all match the
/// configured window width.
pub fn train_sequence_model(
    samples: &[WindowedSample],
    config: &SequenceTrainConfig,
    rng: &mut impl Rng,
) -> Result<SequenceModel> {
    config.validate()?;
    if samples.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if let Some(bad) = samples.iter().find(|s| s.input.len() != config.window) {
        return Err(ForecastError::InvalidInput(format!(
            "sample window width {} does not match configured width {}",
            bad.input.len(),
            config.window
        )));
    }

    let mut net = FeedForwardNet::new(config.window, config.hidden, rng);
    let mut order: Vec<&WindowedSample> = samples.iter().collect();
    let mut epoch_error = 0.0;

    for epoch in 0..config.epochs {
        order.shuffle(rng);

        let mut squared_error = 0.0;
        for batch in order.chunks(config.batch_size) {
            squared_error += net.train_step(batch, config.learning_rate)?;
        }
        epoch_error = squared_error / samples.len() as f64;

        if epoch % 20 == 0 || epoch + 1 == config.epochs {
            debug!(epoch, mse = epoch_error, "sequence training");
        }
    }

    if !epoch_error.is_finite() {
        return Err(ForecastError::ComputationError(format!(
            "sequence training diverged: final epoch error {epoch_error}"
        )));
    }

    Ok(SequenceModel {
        net,
        train_error: epoch_error,
    })
}
