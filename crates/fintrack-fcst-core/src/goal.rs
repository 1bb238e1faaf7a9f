//! Savings-goal completion estimation.
//!
//! A linear projection, deliberately separate from the model pipeline: the
//! monthly savings rate comes either from contributions recorded against
//! the goal itself or from recent income/expense behavior, and the
//! completion date extrapolates at that rate using fixed 30-day months.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::series::{monthly_totals, Period};

/// Dedicated contributions needed before the goal's own cadence is trusted
/// over general income/expense behavior.
pub const MIN_CONTRIBUTIONS_FOR_RATE: usize = 3;

/// Months of transaction history the net-flow fallback looks back over.
pub const NET_FLOW_WINDOW_MONTHS: u32 = 6;

/// Rate floor when derived savings behavior is non-positive: this fraction
/// of the average monthly income.
pub const INCOME_RATE_FLOOR: f64 = 0.10;

/// Projected completion of a savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCompletionEstimate {
    pub is_complete: bool,
    pub remaining_amount: f64,
    pub monthly_savings_rate: f64,
    pub completion_date: NaiveDate,
    pub days_to_completion: i64,
    pub months_to_completion: f64,
}

/// Monthly savings rate from contributions recorded against the goal.
///
/// Returns `None` when fewer than [`MIN_CONTRIBUTIONS_FOR_RATE`]
/// contributions exist. Otherwise the rate is the total contributed divided
/// by the number of distinct months containing a contribution.
pub fn contribution_rate(contributions: &[(NaiveDate, f64)]) -> Option<f64> {
    if contributions.len() < MIN_CONTRIBUTIONS_FOR_RATE {
        return None;
    }

    let months: std::collections::BTreeSet<Period> = contributions
        .iter()
        .map(|&(date, _)| Period::from_date(date))
        .collect();
    let total: f64 = contributions.iter().map(|&(_, amount)| amount).sum();

    Some(total / months.len() as f64)
}

/// Average monthly `income - expense` over the months with any activity.
///
/// Months appearing in neither list do not enter the average; a month with
/// only expenses contributes a negative net. Zero when the window is empty.
pub fn net_flow_rate(incomes: &[(NaiveDate, f64)], expenses: &[(NaiveDate, f64)]) -> f64 {
    let mut nets: BTreeMap<Period, f64> = BTreeMap::new();
    for &(date, amount) in incomes {
        *nets.entry(Period::from_date(date)).or_insert(0.0) += amount;
    }
    for &(date, amount) in expenses {
        *nets.entry(Period::from_date(date)).or_insert(0.0) -= amount;
    }

    if nets.is_empty() {
        return 0.0;
    }
    nets.values().sum::<f64>() / nets.len() as f64
}

/// The floor rate: [`INCOME_RATE_FLOOR`] of the average monthly income.
pub fn income_floor_rate(incomes: &[(NaiveDate, f64)]) -> f64 {
    let monthly = monthly_totals(incomes);
    if monthly.is_empty() {
        return 0.0;
    }
    let mean = monthly.iter().map(|p| p.amount).sum::<f64>() / monthly.len() as f64;
    mean * INCOME_RATE_FLOOR
}

/// Project goal completion by linear extrapolation at `rate` per month.
///
/// `remaining <= 0` short-circuits to an already-complete estimate dated
/// `now`, regardless of the rate. Months are fixed at 30 days; the day
/// count comes from the unrounded month count, then each is rounded for
/// output (days to the nearest integer, months to one decimal).
pub fn project_completion(
    remaining: f64,
    rate: f64,
    now: NaiveDate,
) -> Result<GoalCompletionEstimate> {
    if remaining <= 0.0 {
        return Ok(GoalCompletionEstimate {
            is_complete: true,
            remaining_amount: 0.0,
            monthly_savings_rate: 0.0,
            completion_date: now,
            days_to_completion: 0,
            months_to_completion: 0.0,
        });
    }

    if rate <= 0.0 {
        return Err(ForecastError::ComputationError(
            "monthly savings rate is not positive; cannot project completion".into(),
        ));
    }

    let months = remaining / rate;
    let days = (months * 30.0).round() as i64;
    let completion_date = now.checked_add_signed(Duration::days(days)).ok_or_else(|| {
        ForecastError::ComputationError(format!(
            "completion horizon of {days} days overflows the calendar"
        ))
    })?;

    Ok(GoalCompletionEstimate {
        is_complete: false,
        remaining_amount: remaining,
        monthly_savings_rate: rate,
        completion_date,
        days_to_completion: days,
        months_to_completion: (months * 10.0).round() / 10.0,
    })
}
