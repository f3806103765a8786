//! Per-category descriptive statistics
//!
//! Records are grouped by subject and training type. Each numeric field is
//! averaged over its non-null observations only; a field with no observations
//! reports `null`, never zero.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::models::{SubjectId, TrainingRecord};

/// Records of one subject, keyed by training type
pub type RecordsByType<'a> = BTreeMap<String, Vec<&'a TrainingRecord>>;

/// Two-level grouping: subject, then training type
pub fn group_by_subject_and_type(
    records: &[TrainingRecord],
) -> BTreeMap<SubjectId, RecordsByType<'_>> {
    let mut grouped: BTreeMap<SubjectId, RecordsByType<'_>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.subject_id.clone())
            .or_default()
            .entry(record.training_type.clone())
            .or_default()
            .push(record);
    }
    grouped
}

/// Round to two decimal places, halves away from zero; non-finite input has no value
pub fn round2(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero).normalize())
}

/// Mean of the observations, rounded to two decimals
///
/// Empty input yields `None`.
pub fn mean_rounded<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return None;
    }
    round2(values.iter().mean())
}

/// Aggregated statistics for one training type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub training_type: String,

    /// Number of records in the group, regardless of missing measurements
    pub count: usize,

    #[serde(with = "rust_decimal::serde::float_option")]
    pub hr_before_avg: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub hr_during_avg: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub hr_after_avg: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub temperature_avg: Option<Decimal>,
}

/// Computes per-type summaries
pub struct SummaryAggregator;

impl SummaryAggregator {
    /// Summarize one subject's records, sorted by training type
    pub fn compute_summary(records_by_type: &RecordsByType<'_>) -> Vec<SummaryEntry> {
        records_by_type
            .iter()
            .map(|(training_type, records)| Self::summarize_group(training_type, records))
            .collect()
    }

    fn summarize_group(training_type: &str, records: &[&TrainingRecord]) -> SummaryEntry {
        let field_mean = |field: fn(&TrainingRecord) -> Option<f64>| {
            mean_rounded(records.iter().filter_map(|r| field(r)))
        };

        SummaryEntry {
            training_type: training_type.to_string(),
            count: records.len(),
            hr_before_avg: field_mean(|r| r.heart_rate_before),
            hr_during_avg: field_mean(|r| r.heart_rate_during),
            hr_after_avg: field_mean(|r| r.heart_rate_after),
            temperature_avg: field_mean(|r| r.temperature_celsius),
        }
    }
}
