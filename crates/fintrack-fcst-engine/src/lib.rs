//! Personal-finance forecasting engine.
//!
//! Wires the numeric core to application data: fetches transaction history
//! through injected sources, selects and trains the right model, persists
//! trained artifacts, and wraps every public operation in a stable result
//! envelope that never panics across the boundary.

pub mod error;
pub mod service;
pub mod sources;
pub mod store;
pub mod types;

pub use error::{EngineError, Result};
pub use service::{ForecastService, HISTORY_WINDOW_MONTHS, MIN_RAW_TRANSACTIONS};
pub use sources::{GoalSource, InMemoryGoalSource, InMemoryTransactionSource, TransactionSource};
pub use store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
pub use types::{
    ArtifactKey, Contribution, ForecastData, ForecastResponse, GoalResponse, PredictionKind,
    PredictionResult, SavingsGoal, Transaction, TransactionFilter, TransactionKind,
};

// Core payload types, re-exported so embedders need only this crate.
pub use fintrack_fcst_core::{
    ForecastPoint, GoalCompletionEstimate, ModelChoice, Period, TimeSeriesPoint,
};
