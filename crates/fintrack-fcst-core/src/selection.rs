//! Model selection policy.

use serde::{Deserialize, Serialize};

/// Minimum monthly points before sequence modeling is considered.
pub const MIN_POINTS_FOR_SEQUENCE: usize = 6;

/// Minimum windowed samples the sequence model needs to train on.
pub const MIN_SAMPLES_FOR_SEQUENCE: usize = 3;

/// Which predictor a forecast will use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// Windowed sequence regressor, persisted as an artifact.
    Sequence,
    /// One-step regressor, retrained fresh on every call.
    Simple,
}

impl ModelChoice {
    pub fn name(&self) -> &'static str {
        match self {
            ModelChoice::Sequence => "sequence",
            ModelChoice::Simple => "simple",
        }
    }
}

/// Choose between the sequence and simple predictors.
///
/// Evaluated in order: fewer than [`MIN_POINTS_FOR_SEQUENCE`] monthly points
/// selects the simple model outright; otherwise fewer than
/// [`MIN_SAMPLES_FOR_SEQUENCE`] windowed samples falls back to the simple
/// model; otherwise the sequence model runs. Below these thresholds a
/// sequence model has too few independent windows to generalize, and the
/// single-step predictor is the more stable choice.
pub fn choose_model(monthly_points: usize, windowed_samples: usize) -> ModelChoice {
    if monthly_points < MIN_POINTS_FOR_SEQUENCE {
        return ModelChoice::Simple;
    }
    if windowed_samples < MIN_SAMPLES_FOR_SEQUENCE {
        return ModelChoice::Simple;
    }
    ModelChoice::Sequence
}
