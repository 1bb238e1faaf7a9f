//! Core forecasting algorithms for the FinTrack personal-finance tracker.
//!
//! This crate holds the numeric half of the forecasting engine: monthly
//! aggregation, min-max scaling, sliding-window dataset construction, the
//! model selection policy, the two small regressors, the autoregressive
//! forecast iterator, and the savings-goal completion estimator. It does no
//! I/O and reads no clock; persistence and collaborator access live in the
//! engine crate.

pub mod error;
pub mod forecast;
pub mod goal;
pub mod nn;
pub mod scaling;
pub mod selection;
pub mod sequence;
pub mod series;
pub mod simple;
pub mod windowing;

// Re-exports for convenience
pub use error::{ForecastError, Result};
pub use forecast::{forecast_iter, ForecastIter, ForecastPoint, OneStepModel};
pub use goal::{
    contribution_rate, income_floor_rate, net_flow_rate, project_completion,
    GoalCompletionEstimate, INCOME_RATE_FLOOR, MIN_CONTRIBUTIONS_FOR_RATE,
    NET_FLOW_WINDOW_MONTHS,
};
pub use scaling::ScaleRange;
pub use selection::{
    choose_model, ModelChoice, MIN_POINTS_FOR_SEQUENCE, MIN_SAMPLES_FOR_SEQUENCE,
};
pub use sequence::{train_sequence_model, SequenceModel, SequenceTrainConfig};
pub use series::{amounts, monthly_totals, Period, TimeSeriesPoint};
pub use simple::{train_simple_model, SimpleModel, SimpleTrainConfig};
pub use windowing::{sliding_windows, WindowedSample, SEQUENCE_WINDOW};
