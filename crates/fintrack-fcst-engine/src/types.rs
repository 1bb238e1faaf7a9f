//! Domain records and result envelopes for the engine boundary.
//!
//! Envelopes serialize camelCase so the HTTP layer can hand them to API
//! clients verbatim.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fintrack_fcst_core::{ForecastPoint, GoalCompletionEstimate, ModelChoice, TimeSeriesPoint};

/// Transaction classification as the forecaster reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    /// A contribution moved toward a savings goal.
    Saving,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Saving => "saving",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            "saving" => Ok(TransactionKind::Saving),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction, reduced to the fields the forecaster reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub savings_goal_id: Option<String>,
}

/// Query filter for the transaction source. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub savings_goal_id: Option<String>,
}

impl TransactionFilter {
    /// Whether a transaction satisfies every set field.
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if tx.kind != kind {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if tx.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if tx.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if tx.date > to {
                return false;
            }
        }
        if let Some(goal_id) = &self.savings_goal_id {
            if tx.savings_goal_id.as_deref() != Some(goal_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// A contribution recorded against a savings goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub date: NaiveDate,
    pub amount: f64,
}

/// A savings goal as the external goal store exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub target_amount: f64,
    pub current_amount: f64,
    pub contributions: Vec<Contribution>,
}

/// What a forecast projects: spending or savings contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionKind {
    Spending,
    Savings,
}

impl PredictionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionKind::Spending => "spending",
            PredictionKind::Savings => "savings",
        }
    }

    /// Base name of the persisted model artifact for this kind.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            PredictionKind::Spending => "spending-model",
            PredictionKind::Savings => "savings-model",
        }
    }

    /// Which transaction kind feeds this forecast's series.
    pub fn source_kind(&self) -> TransactionKind {
        match self {
            PredictionKind::Spending => TransactionKind::Expense,
            PredictionKind::Savings => TransactionKind::Saving,
        }
    }
}

impl fmt::Display for PredictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one persisted model artifact.
///
/// Keys are scoped per user so no model trained on one user's history ever
/// serves another user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub user_id: String,
    pub kind: PredictionKind,
}

impl ArtifactKey {
    pub fn new(user_id: impl Into<String>, kind: PredictionKind) -> Self {
        ArtifactKey {
            user_id: user_id.into(),
            kind,
        }
    }

    /// The flat key string used by artifact stores.
    pub fn storage_key(&self) -> String {
        format!("{}-{}", self.user_id, self.kind.artifact_name())
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// The envelope every public operation returns.
///
/// `success=false` with no `error` is an expected shortfall (not enough
/// history, unknown goal); `success=false` with `error` set is a server-side
/// failure. `data` is always present in the JSON, null on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> PredictionResult<T> {
    /// Successful result carrying a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        PredictionResult {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Expected shortfall: no payload, no server error.
    pub fn shortfall(message: impl Into<String>) -> Self {
        PredictionResult {
            success: false,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    /// Server-side failure with diagnostic detail.
    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        PredictionResult {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Payload of a spending/savings forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastData {
    pub historical: Vec<TimeSeriesPoint>,
    pub predictions: Vec<ForecastPoint>,
    pub prediction_type: PredictionKind,
    /// Present only when the simple fallback produced the forecast.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_type: Option<ModelChoice>,
}

/// Envelope of the forecast operations.
pub type ForecastResponse = PredictionResult<ForecastData>;

/// Envelope of the goal-completion operation.
pub type GoalResponse = PredictionResult<GoalCompletionEstimate>;
