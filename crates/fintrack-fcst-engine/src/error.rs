//! Error types for the forecasting engine boundary.

use fintrack_fcst_core::ForecastError;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors crossing the engine boundary.
///
/// Public operations never surface these to callers directly; each pipeline
/// converts its error into a failure envelope at the top of the operation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Savings goal not found: {0}")]
    GoalNotFound(String),

    #[error("Transaction source error: {0}")]
    Source(String),

    #[error("Artifact store error: {0}")]
    Store(String),

    #[error("Artifact codec error: {0}")]
    Artifact(#[from] serde_json::Error),
}

impl EngineError {
    /// True when the failure means "not enough history", which operations
    /// report as a plain shortfall message instead of a server error.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, EngineError::Forecast(e) if e.is_insufficient_data())
    }
}
