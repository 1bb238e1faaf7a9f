//! End-to-end flows through the public service operations, with fresh
//! in-memory stores per test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use chrono::NaiveDate;

use fintrack_fcst_engine::{
    ArtifactKey, ArtifactStore, Contribution, ForecastService, InMemoryArtifactStore,
    InMemoryGoalSource, InMemoryTransactionSource, ModelChoice, PredictionKind,
    Result as EngineResult, SavingsGoal, Transaction, TransactionKind,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tx(kind: TransactionKind, y: i32, m: u32, d: u32, amount: f64) -> Transaction {
    Transaction {
        date: date(y, m, d),
        amount,
        kind,
        category: None,
        savings_goal_id: None,
    }
}

fn expense(y: i32, m: u32, d: u32, amount: f64) -> Transaction {
    tx(TransactionKind::Expense, y, m, d, amount)
}

fn categorized(y: i32, m: u32, d: u32, amount: f64, category: &str) -> Transaction {
    Transaction {
        category: Some(category.to_string()),
        ..expense(y, m, d, amount)
    }
}

/// Eight months of steadily rising spending, enough for the sequence model.
fn upward_trend(user: &str) -> InMemoryTransactionSource {
    let source = InMemoryTransactionSource::new();
    let months = [
        (2023, 9, 100.0),
        (2023, 10, 110.0),
        (2023, 11, 120.0),
        (2023, 12, 130.0),
        (2024, 1, 140.0),
        (2024, 2, 150.0),
        (2024, 3, 160.0),
        (2024, 4, 170.0),
    ];
    source
        .insert_many(
            user,
            months.iter().map(|&(y, m, amount)| expense(y, m, 5, amount)),
        )
        .unwrap();
    source
}

fn goal(target: f64, current: f64, contributions: Vec<Contribution>) -> SavingsGoal {
    SavingsGoal {
        target_amount: target,
        current_amount: current,
        contributions,
    }
}

struct CountingStore {
    inner: InMemoryArtifactStore,
    saves: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        CountingStore {
            inner: InMemoryArtifactStore::new(),
            saves: AtomicUsize::new(0),
        }
    }
}

impl ArtifactStore for CountingStore {
    fn load(&self, key: &ArtifactKey) -> EngineResult<Option<Vec<u8>>> {
        self.inner.load(key)
    }

    fn save(&self, key: &ArtifactKey, bytes: &[u8]) -> EngineResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(key, bytes)
    }
}

#[test]
fn three_months_of_spending_yield_a_simple_forecast() {
    let source = InMemoryTransactionSource::new();
    source
        .insert_many(
            "user-1",
            vec![
                expense(2024, 1, 10, 100.0),
                expense(2024, 2, 10, 120.0),
                expense(2024, 3, 10, 90.0),
            ],
        )
        .unwrap();
    let svc = ForecastService::new(source, InMemoryGoalSource::new(), InMemoryArtifactStore::new());

    let result = svc.predict_spending_at("user-1", 1, None, date(2024, 4, 15));
    assert!(result.success, "message: {}", result.message);
    assert_eq!(result.message, "Prediction generated successfully");

    let data = result.data.unwrap();
    assert_eq!(data.prediction_type, PredictionKind::Spending);
    assert_eq!(data.model_type, Some(ModelChoice::Simple));

    let amounts: Vec<f64> = data.historical.iter().map(|p| p.amount).collect();
    assert_eq!(amounts, vec![100.0, 120.0, 90.0]);

    assert_eq!(data.predictions.len(), 1);
    assert_eq!(data.predictions[0].period.to_string(), "2024-04");
    assert!(data.predictions[0].amount >= 0.0);
}

#[test]
fn eight_month_trend_selects_the_sequence_model() {
    let svc = ForecastService::new(
        upward_trend("user-1"),
        InMemoryGoalSource::new(),
        InMemoryArtifactStore::new(),
    );

    let result = svc.predict_spending_at("user-1", 1, None, date(2024, 4, 20));
    assert!(result.success, "message: {}", result.message);

    let data = result.data.unwrap();
    // Sequence forecasts carry no model tag.
    assert_eq!(data.model_type, None);
    assert_eq!(data.historical.len(), 8);
    assert_eq!(data.predictions.len(), 1);
    assert_eq!(data.predictions[0].period.to_string(), "2024-05");

    // A normalized prediction denormalizes inside the historical range.
    let amount = data.predictions[0].amount;
    assert!((100.0..=170.0).contains(&amount), "amount {}", amount);
}

#[test]
fn twelve_month_forecast_walks_consecutive_periods() {
    let svc = ForecastService::new(
        upward_trend("user-1"),
        InMemoryGoalSource::new(),
        InMemoryArtifactStore::new(),
    );

    let result = svc.predict_spending_at("user-1", 12, None, date(2024, 4, 20));
    let data = result.data.unwrap();

    let periods: Vec<String> = data
        .predictions
        .iter()
        .map(|p| p.period.to_string())
        .collect();
    let expected = vec![
        "2024-05", "2024-06", "2024-07", "2024-08", "2024-09", "2024-10", "2024-11", "2024-12",
        "2025-01", "2025-02", "2025-03", "2025-04",
    ];
    assert_eq!(periods, expected);
    assert!(data.predictions.iter().all(|p| p.amount >= 0.0));
}

#[test]
fn trained_model_is_persisted_and_reused() {
    let store = Arc::new(CountingStore::new());
    let first = ForecastService::new(
        upward_trend("user-1"),
        InMemoryGoalSource::new(),
        Arc::clone(&store),
    );

    let initial = first.predict_spending_at("user-1", 3, None, date(2024, 4, 20));
    assert!(initial.success);
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);

    // Same service: served from the in-process cache, no second save.
    let repeat = first.predict_spending_at("user-1", 3, None, date(2024, 4, 20));
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    assert_eq!(
        initial.data.as_ref().unwrap().predictions,
        repeat.data.as_ref().unwrap().predictions
    );

    // Fresh service over the same artifact store: loads the persisted model
    // instead of retraining, so the forecast is identical.
    let second = ForecastService::new(
        upward_trend("user-1"),
        InMemoryGoalSource::new(),
        Arc::clone(&store),
    );
    let reloaded = second.predict_spending_at("user-1", 3, None, date(2024, 4, 20));
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    assert_eq!(
        initial.data.as_ref().unwrap().predictions,
        reloaded.data.as_ref().unwrap().predictions
    );
}

#[test]
fn corrupt_artifact_is_replaced_by_retraining() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let key = ArtifactKey::new("user-1", PredictionKind::Spending);
    store.save(&key, b"not a model").unwrap();

    let svc = ForecastService::new(
        upward_trend("user-1"),
        InMemoryGoalSource::new(),
        Arc::clone(&store),
    );
    let result = svc.predict_spending_at("user-1", 1, None, date(2024, 4, 20));
    assert!(result.success, "message: {}", result.message);

    let bytes = store.load(&key).unwrap().unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&bytes).is_ok());
}

#[test]
fn artifacts_are_scoped_per_user() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let source = upward_trend("user-1");
    let months = [
        (2023, 9, 300.0),
        (2023, 10, 320.0),
        (2023, 11, 340.0),
        (2023, 12, 360.0),
        (2024, 1, 380.0),
        (2024, 2, 400.0),
        (2024, 3, 420.0),
        (2024, 4, 440.0),
    ];
    source
        .insert_many(
            "user-2",
            months.iter().map(|&(y, m, amount)| expense(y, m, 5, amount)),
        )
        .unwrap();

    let svc = ForecastService::new(source, InMemoryGoalSource::new(), Arc::clone(&store));
    assert!(svc.predict_spending_at("user-1", 1, None, date(2024, 4, 20)).success);
    assert!(svc.predict_spending_at("user-2", 1, None, date(2024, 4, 20)).success);

    assert_eq!(store.len(), 2);
    let user_1 = ArtifactKey::new("user-1", PredictionKind::Spending);
    let user_2 = ArtifactKey::new("user-2", PredictionKind::Spending);
    assert!(store.load(&user_1).unwrap().is_some());
    assert!(store.load(&user_2).unwrap().is_some());
}

#[test]
fn category_filter_restricts_the_series() {
    let source = InMemoryTransactionSource::new();
    source
        .insert_many(
            "user-1",
            vec![
                categorized(2024, 1, 3, 30.0, "groceries"),
                categorized(2024, 2, 3, 35.0, "groceries"),
                categorized(2024, 3, 3, 40.0, "groceries"),
                categorized(2024, 1, 1, 800.0, "rent"),
                categorized(2024, 2, 1, 800.0, "rent"),
                categorized(2024, 3, 1, 800.0, "rent"),
            ],
        )
        .unwrap();
    let svc = ForecastService::new(source, InMemoryGoalSource::new(), InMemoryArtifactStore::new());

    let groceries = svc.predict_spending_at("user-1", 1, Some("groceries"), date(2024, 4, 15));
    let amounts: Vec<f64> = groceries
        .data
        .unwrap()
        .historical
        .iter()
        .map(|p| p.amount)
        .collect();
    assert_eq!(amounts, vec![30.0, 35.0, 40.0]);

    let all = svc.predict_spending_at("user-1", 1, None, date(2024, 4, 15));
    let amounts: Vec<f64> = all
        .data
        .unwrap()
        .historical
        .iter()
        .map(|p| p.amount)
        .collect();
    assert_eq!(amounts, vec![830.0, 835.0, 840.0]);
}

#[test]
fn savings_forecast_reads_only_saving_transactions() {
    let source = InMemoryTransactionSource::new();
    source
        .insert_many(
            "user-1",
            vec![
                tx(TransactionKind::Saving, 2024, 1, 28, 50.0),
                tx(TransactionKind::Saving, 2024, 2, 28, 55.0),
                tx(TransactionKind::Saving, 2024, 3, 28, 60.0),
                tx(TransactionKind::Saving, 2024, 4, 28, 65.0),
                expense(2024, 1, 10, 900.0),
                expense(2024, 2, 10, 950.0),
            ],
        )
        .unwrap();
    let svc = ForecastService::new(source, InMemoryGoalSource::new(), InMemoryArtifactStore::new());

    let result = svc.predict_savings_at("user-1", 2, date(2024, 5, 15));
    assert!(result.success, "message: {}", result.message);

    let data = result.data.unwrap();
    assert_eq!(data.prediction_type, PredictionKind::Savings);
    let amounts: Vec<f64> = data.historical.iter().map(|p| p.amount).collect();
    assert_eq!(amounts, vec![50.0, 55.0, 60.0, 65.0]);
    assert_eq!(data.predictions.len(), 2);
    assert_eq!(data.predictions[0].period.to_string(), "2024-05");
    assert_eq!(data.predictions[1].period.to_string(), "2024-06");
}

#[test]
fn transactions_outside_the_trailing_year_do_not_count() {
    let source = InMemoryTransactionSource::new();
    source
        .insert_many(
            "user-1",
            (1..=12).map(|m| expense(2022, m, 10, 100.0)),
        )
        .unwrap();
    source
        .insert_many(
            "user-1",
            vec![expense(2024, 2, 10, 100.0), expense(2024, 3, 10, 100.0)],
        )
        .unwrap();
    let svc = ForecastService::new(source, InMemoryGoalSource::new(), InMemoryArtifactStore::new());

    let result = svc.predict_spending_at("user-1", 1, None, date(2024, 4, 15));
    assert!(!result.success);
    assert_eq!(result.message, "Not enough historical data for prediction");
    assert!(result.error.is_none());
}

#[test]
fn single_month_of_history_is_a_shortfall_not_a_failure() {
    // Three transactions clear the raw-count gate but collapse into one
    // monthly total, which is too short to train on.
    let source = InMemoryTransactionSource::new();
    source
        .insert_many(
            "user-1",
            vec![
                expense(2024, 3, 3, 40.0),
                expense(2024, 3, 12, 55.0),
                expense(2024, 3, 27, 25.0),
            ],
        )
        .unwrap();
    let svc = ForecastService::new(source, InMemoryGoalSource::new(), InMemoryArtifactStore::new());

    let result = svc.predict_spending_at("user-1", 2, None, date(2024, 4, 15));
    assert!(!result.success);
    assert_eq!(result.message, "Not enough historical data for prediction");
    assert!(result.error.is_none());
    assert!(result.data.is_none());
}

#[test]
fn reached_goal_completes_immediately() {
    let goals = InMemoryGoalSource::new();
    goals
        .insert("user-1", "goal-1", goal(1000.0, 1000.0, vec![]))
        .unwrap();
    let svc = ForecastService::new(
        InMemoryTransactionSource::new(),
        goals,
        InMemoryArtifactStore::new(),
    );

    let now = date(2024, 4, 15);
    let result = svc.predict_goal_completion_at("user-1", "goal-1", now);
    assert!(result.success, "message: {}", result.message);

    let estimate = result.data.unwrap();
    assert!(estimate.is_complete);
    assert_eq!(estimate.days_to_completion, 0);
    assert_eq!(estimate.months_to_completion, 0.0);
    assert_eq!(estimate.completion_date, now);
}

#[test]
fn four_contributions_set_the_monthly_rate() {
    let goals = InMemoryGoalSource::new();
    let contributions = vec![
        Contribution { date: date(2024, 1, 10), amount: 50.0 },
        Contribution { date: date(2024, 2, 10), amount: 50.0 },
        Contribution { date: date(2024, 3, 10), amount: 50.0 },
        Contribution { date: date(2024, 4, 10), amount: 50.0 },
    ];
    goals
        .insert("user-1", "goal-1", goal(500.0, 100.0, contributions))
        .unwrap();
    let svc = ForecastService::new(
        InMemoryTransactionSource::new(),
        goals,
        InMemoryArtifactStore::new(),
    );

    let result = svc.predict_goal_completion_at("user-1", "goal-1", date(2024, 4, 15));
    assert!(result.success, "message: {}", result.message);

    let estimate = result.data.unwrap();
    assert!(!estimate.is_complete);
    assert_eq!(estimate.remaining_amount, 400.0);
    assert_eq!(estimate.monthly_savings_rate, 50.0);
    assert_eq!(estimate.months_to_completion, 8.0);
    assert_eq!(estimate.days_to_completion, 240);
    assert_eq!(estimate.completion_date, date(2024, 12, 11));
}

#[test]
fn few_contributions_fall_back_to_net_cash_flow() {
    let source = InMemoryTransactionSource::new();
    for m in 2..=4 {
        source.insert("user-1", tx(TransactionKind::Income, 2024, m, 1, 2000.0)).unwrap();
        source.insert("user-1", expense(2024, m, 20, 1500.0)).unwrap();
    }
    let goals = InMemoryGoalSource::new();
    let contributions = vec![
        Contribution { date: date(2024, 3, 5), amount: 100.0 },
        Contribution { date: date(2024, 4, 5), amount: 100.0 },
    ];
    goals
        .insert("user-1", "goal-1", goal(2000.0, 1000.0, contributions))
        .unwrap();
    let svc = ForecastService::new(source, goals, InMemoryArtifactStore::new());

    let result = svc.predict_goal_completion_at("user-1", "goal-1", date(2024, 4, 15));
    assert!(result.success, "message: {}", result.message);

    let estimate = result.data.unwrap();
    // Two contributions are not enough history; income 2000 minus spending
    // 1500 gives a 500/month rate over 1000 remaining.
    assert_eq!(estimate.monthly_savings_rate, 500.0);
    assert_eq!(estimate.months_to_completion, 2.0);
    assert_eq!(estimate.days_to_completion, 60);
    assert_eq!(estimate.completion_date, date(2024, 6, 14));
}

#[test]
fn negative_net_flow_applies_the_income_floor() {
    let source = InMemoryTransactionSource::new();
    for m in 2..=4 {
        source.insert("user-1", tx(TransactionKind::Income, 2024, m, 1, 1000.0)).unwrap();
        source.insert("user-1", expense(2024, m, 20, 1200.0)).unwrap();
    }
    let goals = InMemoryGoalSource::new();
    goals
        .insert("user-1", "goal-1", goal(400.0, 100.0, vec![]))
        .unwrap();
    let svc = ForecastService::new(source, goals, InMemoryArtifactStore::new());

    let result = svc.predict_goal_completion_at("user-1", "goal-1", date(2024, 4, 15));
    assert!(result.success, "message: {}", result.message);

    let estimate = result.data.unwrap();
    // Net flow is -200/month, so the rate floors at 10% of the 1000 average
    // monthly income.
    assert_relative_eq!(estimate.monthly_savings_rate, 100.0, epsilon = 1e-9);
    assert_eq!(estimate.months_to_completion, 3.0);
    assert_eq!(estimate.days_to_completion, 90);
    assert_eq!(estimate.completion_date, date(2024, 7, 14));
}

#[test]
fn forecast_envelope_serializes_for_the_api() {
    let source = InMemoryTransactionSource::new();
    source
        .insert_many(
            "user-1",
            vec![
                expense(2024, 1, 10, 100.0),
                expense(2024, 2, 10, 120.0),
                expense(2024, 3, 10, 90.0),
            ],
        )
        .unwrap();
    let svc = ForecastService::new(source, InMemoryGoalSource::new(), InMemoryArtifactStore::new());

    let result = svc.predict_spending_at("user-1", 1, None, date(2024, 4, 15));
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["predictionType"], "spending");
    assert_eq!(json["data"]["modelType"], "simple");
    assert_eq!(json["data"]["historical"][0]["period"], "2024-01");
    assert_eq!(json["data"]["historical"][0]["amount"], 100.0);
    assert_eq!(json["data"]["predictions"][0]["period"], "2024-04");
    assert!(json.get("error").is_none());
}
