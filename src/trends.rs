//! Time-bucketed heart-rate trends
//!
//! Two windowings over the same records: calendar months over the whole
//! history, and calendar days over a trailing window ending at a reference
//! instant captured once per run. All bucketing is done in UTC.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::TrainingRecord;
use crate::summary::{mean_rounded, RecordsByType};

/// Default trailing window length in days
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

const MONTH_FORMAT: &str = "%Y-%m";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Average heart rate during exercise for one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM` or `YYYY-MM-DD`
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

/// Trend points per training type
pub type TrendSeries = BTreeMap<String, Vec<TrendPoint>>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub by_month: TrendSeries,
    #[serde(rename = "last7Days")]
    pub last_7_days: TrendSeries,
}

/// Computes monthly and trailing-window trends
#[derive(Debug, Clone)]
pub struct TrendCalculator {
    now: DateTime<Utc>,
    window_days: i64,
}

impl TrendCalculator {
    /// Create a calculator anchored at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        TrendCalculator {
            now,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_window_days(now: DateTime<Utc>, window_days: i64) -> Self {
        TrendCalculator { now, window_days }
    }

    /// Whether a timestamp falls inside the trailing window
    ///
    /// Elapsed whole days are compared, so a record exactly `window_days`
    /// old is included and one a day older is not.
    pub fn in_window(&self, created_at: DateTime<Utc>) -> bool {
        (self.now - created_at).num_days() <= self.window_days
    }

    /// Compute both windowings for one subject
    pub fn compute_trends(&self, records_by_type: &RecordsByType<'_>) -> TrendReport {
        let mut report = TrendReport::default();

        for (training_type, records) in records_by_type {
            let mut monthly: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            let mut daily: BTreeMap<String, Vec<f64>> = BTreeMap::new();

            for record in records.iter().copied().filter(|r| has_heart_rate_during(r)) {
                let value = record.heart_rate_during.unwrap_or_default();
                monthly
                    .entry(record.created_at.format(MONTH_FORMAT).to_string())
                    .or_default()
                    .push(value);

                if self.in_window(record.created_at) {
                    daily
                        .entry(record.created_at.format(DAY_FORMAT).to_string())
                        .or_default()
                        .push(value);
                }
            }

            if !monthly.is_empty() {
                report
                    .by_month
                    .insert(training_type.clone(), average_by_label(monthly));
            }
            if !daily.is_empty() {
                report
                    .last_7_days
                    .insert(training_type.clone(), average_by_label(daily));
            }
        }

        report
    }
}

fn has_heart_rate_during(record: &TrainingRecord) -> bool {
    record.heart_rate_during.map_or(false, |hr| hr != 0.0)
}

/// Labels come out ascending because the buckets are a `BTreeMap`
fn average_by_label(buckets: BTreeMap<String, Vec<f64>>) -> Vec<TrendPoint> {
    buckets
        .into_iter()
        .filter_map(|(label, values)| {
            mean_rounded(values).map(|value| TrendPoint { label, value })
        })
        .collect()
}
