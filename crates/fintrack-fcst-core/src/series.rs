//! Monthly time-series representation and aggregation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ForecastError, Result};

/// A calendar month, the granularity of every series in this crate.
///
/// Ordering is chronological; the `Display`/`FromStr` form is `YYYY-MM`,
/// which is also the serialized representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period, validating the month number.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::InvalidPeriod(format!("{year}-{month}")));
        }
        Ok(Period { year, month })
    }

    /// The period containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Period {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Period {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Period {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| ForecastError::InvalidPeriod(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| ForecastError::InvalidPeriod(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| ForecastError::InvalidPeriod(s.to_string()))?;
        Period::new(year, month)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One month of aggregated history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: Period,
    pub amount: f64,
}

/// Aggregate dated cashflow records into monthly totals.
///
/// Produces one point per calendar month that has at least one record, with
/// the month's amounts summed, sorted ascending by period. Months without
/// records are absent; nothing is zero-filled. The output is independent of
/// the input ordering. An empty input yields an empty series, which callers
/// must treat as insufficient data.
///
/// # Arguments
/// * `records` - `(date, amount)` pairs, already filtered to the relevant
///   user, transaction kind, date range, and category
pub fn monthly_totals(records: &[(NaiveDate, f64)]) -> Vec<TimeSeriesPoint> {
    let mut totals: BTreeMap<Period, f64> = BTreeMap::new();
    for &(date, amount) in records {
        *totals.entry(Period::from_date(date)).or_insert(0.0) += amount;
    }

    totals
        .into_iter()
        .map(|(period, amount)| TimeSeriesPoint { period, amount })
        .collect()
}

/// The amounts of a series, in order.
pub fn amounts(series: &[TimeSeriesPoint]) -> Vec<f64> {
    series.iter().map(|p| p.amount).collect()
}
