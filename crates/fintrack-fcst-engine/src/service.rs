//! The forecasting service: the public operations of the engine.
//!
//! Every operation returns a [`PredictionResult`] envelope and never an
//! `Err` or a panic. Expected shortfalls (thin history, unknown goal) come
//! back as `success=false` with a message only; anything else is caught at
//! this boundary, logged, and reported with the error detail attached.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::RwLock;

use chrono::{Months, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use fintrack_fcst_core::{
    amounts, choose_model, contribution_rate, forecast_iter, income_floor_rate, monthly_totals,
    net_flow_rate, project_completion, sliding_windows, train_sequence_model, train_simple_model,
    ForecastError, GoalCompletionEstimate, ModelChoice, OneStepModel, ScaleRange, SequenceModel,
    SequenceTrainConfig, SimpleTrainConfig, WindowedSample, NET_FLOW_WINDOW_MONTHS,
};

use crate::error::{EngineError, Result};
use crate::sources::{GoalSource, TransactionSource};
use crate::store::ArtifactStore;
use crate::types::{
    ArtifactKey, ForecastData, ForecastResponse, GoalResponse, PredictionKind, PredictionResult,
    TransactionFilter, TransactionKind,
};

/// Raw transactions required in the trailing year before any forecast runs.
pub const MIN_RAW_TRANSACTIONS: usize = 3;

/// Months of history a forecast looks back over.
pub const HISTORY_WINDOW_MONTHS: u32 = 12;

/// Forecasting engine over injected transaction, goal, and artifact stores.
///
/// Trained sequence models are cached per artifact key for the lifetime of
/// the service and persisted through the artifact store, so repeat forecasts
/// for the same user skip training entirely.
pub struct ForecastService<T, G, A> {
    transactions: T,
    goals: G,
    artifacts: A,
    sequence_config: SequenceTrainConfig,
    simple_config: SimpleTrainConfig,
    model_cache: RwLock<HashMap<String, SequenceModel>>,
}

impl<T, G, A> ForecastService<T, G, A>
where
    T: TransactionSource,
    G: GoalSource,
    A: ArtifactStore,
{
    pub fn new(transactions: T, goals: G, artifacts: A) -> Self {
        Self::with_configs(
            transactions,
            goals,
            artifacts,
            SequenceTrainConfig::default(),
            SimpleTrainConfig::default(),
        )
    }

    pub fn with_configs(
        transactions: T,
        goals: G,
        artifacts: A,
        sequence_config: SequenceTrainConfig,
        simple_config: SimpleTrainConfig,
    ) -> Self {
        ForecastService {
            transactions,
            goals,
            artifacts,
            sequence_config,
            simple_config,
            model_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Forecast a user's monthly spending, optionally for one category.
    pub fn predict_spending(
        &self,
        user_id: &str,
        months: u32,
        category: Option<&str>,
    ) -> ForecastResponse {
        self.predict_spending_at(user_id, months, category, Utc::now().date_naive())
    }

    /// [`predict_spending`](Self::predict_spending) with an explicit "today",
    /// for embedding and tests.
    pub fn predict_spending_at(
        &self,
        user_id: &str,
        months: u32,
        category: Option<&str>,
        now: NaiveDate,
    ) -> ForecastResponse {
        self.forecast_op(user_id, PredictionKind::Spending, months, category, now)
    }

    /// Forecast a user's monthly savings contributions.
    pub fn predict_savings(&self, user_id: &str, months: u32) -> ForecastResponse {
        self.predict_savings_at(user_id, months, Utc::now().date_naive())
    }

    /// [`predict_savings`](Self::predict_savings) with an explicit "today".
    pub fn predict_savings_at(&self, user_id: &str, months: u32, now: NaiveDate) -> ForecastResponse {
        self.forecast_op(user_id, PredictionKind::Savings, months, None, now)
    }

    /// Estimate when a savings goal will be reached.
    pub fn predict_goal_completion(&self, user_id: &str, goal_id: &str) -> GoalResponse {
        self.predict_goal_completion_at(user_id, goal_id, Utc::now().date_naive())
    }

    /// [`predict_goal_completion`](Self::predict_goal_completion) with an
    /// explicit "today".
    pub fn predict_goal_completion_at(
        &self,
        user_id: &str,
        goal_id: &str,
        now: NaiveDate,
    ) -> GoalResponse {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run_goal_estimate(user_id, goal_id, now)
        }));
        match outcome {
            Ok(Ok(estimate)) => PredictionResult::ok("Goal completion estimated", estimate),
            Ok(Err(EngineError::GoalNotFound(_))) => {
                info!(user = user_id, goal = goal_id, "savings goal not found");
                PredictionResult::shortfall("Savings goal not found")
            }
            Ok(Err(err)) if err.is_insufficient_data() => {
                info!(user = user_id, goal = goal_id, %err, "not enough history for estimate");
                PredictionResult::shortfall("Not enough historical data for prediction")
            }
            Ok(Err(err)) => {
                error!(user = user_id, goal = goal_id, %err, "goal estimate failed");
                PredictionResult::failed("Error predicting goal completion", err.to_string())
            }
            Err(payload) => {
                let detail = panic_message(payload);
                error!(user = user_id, goal = goal_id, detail = %detail, "goal estimate panicked");
                PredictionResult::failed("Error predicting goal completion", detail)
            }
        }
    }

    fn forecast_op(
        &self,
        user_id: &str,
        kind: PredictionKind,
        months: u32,
        category: Option<&str>,
        now: NaiveDate,
    ) -> ForecastResponse {
        if months == 0 {
            return PredictionResult::shortfall("Forecast horizon must be at least 1 month");
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run_forecast(user_id, kind, months, category, now)
        }));
        match outcome {
            Ok(Ok(data)) => PredictionResult::ok("Prediction generated successfully", data),
            Ok(Err(err)) if err.is_insufficient_data() => {
                info!(user = user_id, kind = %kind, %err, "not enough history to forecast");
                PredictionResult::shortfall("Not enough historical data for prediction")
            }
            Ok(Err(err)) => {
                error!(user = user_id, kind = %kind, %err, "forecast failed");
                PredictionResult::failed(format!("Error predicting {}", kind), err.to_string())
            }
            Err(payload) => {
                let detail = panic_message(payload);
                error!(user = user_id, kind = %kind, detail = %detail, "forecast panicked");
                PredictionResult::failed(format!("Error predicting {}", kind), detail)
            }
        }
    }

    fn run_forecast(
        &self,
        user_id: &str,
        kind: PredictionKind,
        months: u32,
        category: Option<&str>,
        now: NaiveDate,
    ) -> Result<ForecastData> {
        let date_from = now
            .checked_sub_months(Months::new(HISTORY_WINDOW_MONTHS))
            .ok_or_else(|| {
                ForecastError::ComputationError("history window underflows the calendar".into())
            })?;
        let filter = TransactionFilter {
            kind: Some(kind.source_kind()),
            category: category.map(str::to_string),
            date_from: Some(date_from),
            date_to: Some(now),
            ..Default::default()
        };
        let transactions = self.transactions.find_transactions(user_id, &filter)?;
        if transactions.len() < MIN_RAW_TRANSACTIONS {
            return Err(ForecastError::InsufficientData {
                needed: MIN_RAW_TRANSACTIONS,
                got: transactions.len(),
            }
            .into());
        }

        let records: Vec<(NaiveDate, f64)> =
            transactions.iter().map(|t| (t.date, t.amount)).collect();
        let historical = monthly_totals(&records);
        let last_period = historical
            .last()
            .map(|p| p.period)
            .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;

        let values = amounts(&historical);
        let range = ScaleRange::fit(&values);
        let normalized = range.normalize_all(&values);
        let samples = sliding_windows(&normalized, self.sequence_config.window);
        let choice = choose_model(historical.len(), samples.len());
        debug!(
            user = user_id,
            kind = %kind,
            points = historical.len(),
            samples = samples.len(),
            model = choice.name(),
            "model selected"
        );

        let horizon = months as usize;
        let (predictions, model_type) = match choice {
            ModelChoice::Sequence => {
                let model = self.sequence_model(&ArtifactKey::new(user_id, kind), &samples)?;
                let points =
                    forecast_iter(&model, &normalized, range, last_period, horizon)?.collect();
                (points, None)
            }
            ModelChoice::Simple => {
                warn!(
                    user = user_id,
                    kind = %kind,
                    points = historical.len(),
                    "history too thin for the sequence model, using the simple model"
                );
                let model =
                    train_simple_model(&normalized, &self.simple_config, &mut rand::thread_rng())?;
                let points =
                    forecast_iter(&model, &normalized, range, last_period, horizon)?.collect();
                (points, Some(ModelChoice::Simple))
            }
        };

        Ok(ForecastData {
            historical,
            predictions,
            prediction_type: kind,
            model_type,
        })
    }

    /// A sequence model for the key: cached, else persisted, else trained.
    ///
    /// Unreadable or mismatched artifacts are not errors; the model is
    /// retrained and the artifact overwritten.
    fn sequence_model(&self, key: &ArtifactKey, samples: &[WindowedSample]) -> Result<SequenceModel> {
        let storage_key = key.storage_key();

        {
            let cache = self.model_cache.read().map_err(|e| {
                EngineError::Store(format!("model cache lock poisoned: {}", e))
            })?;
            if let Some(model) = cache.get(&storage_key) {
                info!(key = %key, "using cached sequence model");
                return Ok(model.clone());
            }
        }

        if let Some(bytes) = self.artifacts.load(key)? {
            match serde_json::from_slice::<SequenceModel>(&bytes) {
                Ok(model) if model.window() == self.sequence_config.window => {
                    info!(key = %key, "loaded persisted sequence model");
                    self.cache_model(storage_key, model.clone())?;
                    return Ok(model);
                }
                Ok(model) => {
                    warn!(
                        key = %key,
                        window = model.window(),
                        expected = self.sequence_config.window,
                        "persisted model window mismatch, retraining"
                    );
                }
                Err(err) => {
                    warn!(key = %key, %err, "persisted model artifact unreadable, retraining");
                }
            }
        }

        info!(key = %key, samples = samples.len(), "training sequence model");
        let model = train_sequence_model(samples, &self.sequence_config, &mut rand::thread_rng())?;
        let bytes = serde_json::to_vec(&model)?;
        self.artifacts.save(key, &bytes)?;
        self.cache_model(storage_key, model.clone())?;
        Ok(model)
    }

    fn cache_model(&self, storage_key: String, model: SequenceModel) -> Result<()> {
        let mut cache = self
            .model_cache
            .write()
            .map_err(|e| EngineError::Store(format!("model cache lock poisoned: {}", e)))?;
        cache.insert(storage_key, model);
        Ok(())
    }

    fn run_goal_estimate(
        &self,
        user_id: &str,
        goal_id: &str,
        now: NaiveDate,
    ) -> Result<GoalCompletionEstimate> {
        let goal = self
            .goals
            .find_savings_goal(user_id, goal_id)?
            .ok_or_else(|| EngineError::GoalNotFound(goal_id.to_string()))?;

        let remaining = goal.target_amount - goal.current_amount;
        if remaining <= 0.0 {
            debug!(user = user_id, goal = goal_id, "goal already complete");
            return Ok(project_completion(remaining, 0.0, now)?);
        }

        let contributions: Vec<(NaiveDate, f64)> = goal
            .contributions
            .iter()
            .map(|c| (c.date, c.amount))
            .collect();

        let mut cash_flow: Option<CashFlow> = None;
        let derived = match contribution_rate(&contributions) {
            Some(rate) => rate,
            None => {
                let flow = self.recent_cash_flow(user_id, now)?;
                let rate = net_flow_rate(&flow.incomes, &flow.expenses);
                cash_flow = Some(flow);
                rate
            }
        };

        let rate = if derived > 0.0 {
            derived
        } else {
            let incomes = match cash_flow {
                Some(flow) => flow.incomes,
                None => self.recent_cash_flow(user_id, now)?.incomes,
            };
            warn!(
                user = user_id,
                goal = goal_id,
                derived,
                "derived savings rate is not positive, applying the income floor"
            );
            income_floor_rate(&incomes)
        };

        Ok(project_completion(remaining, rate, now)?)
    }

    /// Income and expense records over the trailing net-flow window.
    fn recent_cash_flow(&self, user_id: &str, now: NaiveDate) -> Result<CashFlow> {
        let date_from = now
            .checked_sub_months(Months::new(NET_FLOW_WINDOW_MONTHS))
            .ok_or_else(|| {
                ForecastError::ComputationError("cash-flow window underflows the calendar".into())
            })?;
        let filter = TransactionFilter {
            date_from: Some(date_from),
            date_to: Some(now),
            ..Default::default()
        };

        let mut flow = CashFlow::default();
        for tx in self.transactions.find_transactions(user_id, &filter)? {
            match tx.kind {
                TransactionKind::Income => flow.incomes.push((tx.date, tx.amount)),
                TransactionKind::Expense => flow.expenses.push((tx.date, tx.amount)),
                TransactionKind::Saving => {}
            }
        }
        Ok(flow)
    }
}

#[derive(Default)]
struct CashFlow {
    incomes: Vec<(NaiveDate, f64)>,
    expenses: Vec<(NaiveDate, f64)>,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected panic".to_string()
    }
}
