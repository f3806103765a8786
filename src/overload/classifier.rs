use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::encoding::encode;
use super::forest::OverloadModel;
use super::metrics::{train_test_split, ClassificationReport};
use super::rules::{OverloadRule, RuleEvaluator};
use super::{OverloadConfig, OverloadSample};
use crate::error::{AnalysisOutcome, EmptyReason, Result};
use crate::models::TrainingRecord;

/// Rule, model and reconciled flags for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverloadVerdict {
    pub rule_flag: bool,
    pub model_flag: bool,
    pub final_flag: bool,
}

impl OverloadVerdict {
    /// Rules take precedence; the model can only add positives
    pub fn reconcile(rule_flag: bool, model_flag: bool) -> Self {
        OverloadVerdict {
            rule_flag,
            model_flag,
            final_flag: rule_flag || model_flag,
        }
    }
}

/// Per-record detail persisted with the overload document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverloadDetail {
    pub training_type: String,
    pub intensity: Option<String>,
    pub created_at: DateTime<Utc>,
    pub temperature: f64,
    pub duration: f64,
    pub hr_before: f64,
    pub hr_during: f64,
    pub hr_after: f64,
    pub rating_score: Option<f64>,

    /// Supervised label derived from the rating
    pub overloaded: bool,

    pub triggered_rules: Vec<OverloadRule>,

    #[serde(flatten)]
    pub verdict: OverloadVerdict,
}

/// Subject-level counts plus held-out model quality
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverloadStats {
    pub total: usize,
    pub overloaded_count: usize,
    pub ok_count: usize,
    pub rule_flagged: usize,
    pub model_flagged: usize,

    /// Records each rule fired on, every rule listed
    pub rule_hits: BTreeMap<OverloadRule, usize>,

    #[serde(with = "rust_decimal::serde::float_option")]
    pub accuracy: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub precision: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub recall: Option<Decimal>,
}

/// Everything one overload run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverloadAnalysis {
    pub stats: OverloadStats,
    pub details: Vec<OverloadDetail>,
}

/// Trains and applies the hybrid overload policy for one subject
pub struct OverloadClassifier {
    config: OverloadConfig,
    rules: RuleEvaluator,
}

impl OverloadClassifier {
    pub fn new() -> Self {
        Self::with_config(OverloadConfig::default())
    }

    pub fn with_config(config: OverloadConfig) -> Self {
        let rules = RuleEvaluator::new(config.rules.clone());
        OverloadClassifier { config, rules }
    }

    /// Classify one subject's completed records
    ///
    /// Records missing a numeric feature are dropped first. With fewer than
    /// `min_records` left the outcome is [`AnalysisOutcome::Empty`]. The
    /// held-out split only feeds the reported metrics; the verdicts come from
    /// the fitted forest applied to the whole batch.
    pub fn classify(&self, records: &[TrainingRecord]) -> Result<AnalysisOutcome<OverloadAnalysis>> {
        self.config.validate()?;

        let usable: Vec<(&TrainingRecord, OverloadSample)> = records
            .iter()
            .filter_map(|record| OverloadSample::from_record(record).map(|s| (record, s)))
            .collect();

        debug!(
            records = records.len(),
            usable = usable.len(),
            dropped = records.len() - usable.len(),
            "Prepared overload batch"
        );

        if usable.len() < self.config.min_records {
            return Ok(AnalysisOutcome::Empty(EmptyReason::InsufficientRecords {
                usable: usable.len(),
                required: self.config.min_records,
            }));
        }

        let samples: Vec<OverloadSample> = usable.iter().map(|(_, s)| s.clone()).collect();
        let labels: Vec<bool> = samples
            .iter()
            .map(|s| s.is_overloaded(self.config.overload_rating_max))
            .collect();

        let (matrix, encoding) = encode(&samples);
        debug!(classes = ?encoding.columns, "Encoded categorical features");
        let split = train_test_split(matrix.n_samples(), self.config.test_fraction, self.config.seed);

        let x_train = matrix.select(&split.train);
        let y_train: Vec<bool> = split.train.iter().map(|&i| labels[i]).collect();
        let model = OverloadModel::fit(&x_train, &y_train, &self.config.forest, self.config.seed)?;

        let y_test: Vec<bool> = split.test.iter().map(|&i| labels[i]).collect();
        let test_predictions = model.predict_all(&matrix.select(&split.test))?;
        let report = ClassificationReport::evaluate(&y_test, &test_predictions);

        info!(
            train = split.train.len(),
            test = report.test_size,
            accuracy = ?report.accuracy,
            precision = ?report.precision,
            recall = ?report.recall,
            "Overload model evaluated on held-out records"
        );

        let model_flags = model.predict_all(&matrix.rows)?;

        let details: Vec<OverloadDetail> = usable
            .iter()
            .zip(&labels)
            .zip(&model_flags)
            .map(|(((record, sample), &overloaded), &model_flag)| {
                let triggered_rules = self.rules.triggered(record);
                let verdict = OverloadVerdict::reconcile(!triggered_rules.is_empty(), model_flag);
                OverloadDetail {
                    training_type: sample.training_type.clone(),
                    intensity: sample.intensity.clone(),
                    created_at: record.created_at,
                    temperature: sample.temperature,
                    duration: sample.duration,
                    hr_before: sample.hr_before,
                    hr_during: sample.hr_during,
                    hr_after: sample.hr_after,
                    rating_score: sample.rating_score,
                    overloaded,
                    triggered_rules,
                    verdict,
                }
            })
            .collect();

        let stats = Self::stats(&details, &report);
        Ok(AnalysisOutcome::Success(OverloadAnalysis { stats, details }))
    }

    fn stats(details: &[OverloadDetail], report: &ClassificationReport) -> OverloadStats {
        let count = |pick: fn(&OverloadVerdict) -> bool| {
            details.iter().filter(|d| pick(&d.verdict)).count()
        };
        let overloaded_count = count(|v| v.final_flag);

        let mut rule_hits: BTreeMap<OverloadRule, usize> =
            OverloadRule::ALL.iter().map(|&rule| (rule, 0)).collect();
        for rule in details.iter().flat_map(|d| &d.triggered_rules) {
            *rule_hits.entry(*rule).or_default() += 1;
        }

        OverloadStats {
            total: details.len(),
            overloaded_count,
            ok_count: details.len() - overloaded_count,
            rule_flagged: count(|v| v.rule_flag),
            model_flagged: count(|v| v.model_flag),
            rule_hits,
            accuracy: report.accuracy,
            precision: report.precision,
            recall: report.recall,
        }
    }
}

impl Default for OverloadClassifier {
    fn default() -> Self {
        Self::new()
    }
}
