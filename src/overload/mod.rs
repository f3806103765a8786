//! Overload detection
//!
//! Hybrid policy: deterministic rules ([`rules`]) reconciled with a smartcore
//! random forest ([`forest`]) trained from scratch on the subject's own batch. The
//! final verdict is `rule_flag || model_flag`, so the model can only add
//! positives the rules missed.

pub mod classifier;
pub mod encoding;
pub mod forest;
pub mod metrics;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::TrainingRecord;

pub use classifier::{OverloadAnalysis, OverloadClassifier, OverloadDetail, OverloadStats, OverloadVerdict};
pub use encoding::{encode, EncodingTable, FeatureMatrix};
pub use forest::{ForestConfig, OverloadModel};
pub use metrics::{train_test_split, ClassificationReport, TrainTestSplit};
pub use rules::{OverloadRule, RuleEvaluator, RuleThresholds};

/// Overload analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverloadConfig {
    /// Fewer usable records than this is "insufficient data"
    pub min_records: usize,

    /// Share of the batch held out for evaluation
    pub test_fraction: f64,

    /// Seed for the split and the forest
    pub seed: u64,

    /// Ratings at or below this label a record as overloaded
    pub overload_rating_max: f64,

    pub rules: RuleThresholds,

    pub forest: ForestConfig,
}

impl Default for OverloadConfig {
    fn default() -> Self {
        OverloadConfig {
            min_records: 5,
            test_fraction: 0.25,
            seed: 42,
            overload_rating_max: 2.0,
            rules: RuleThresholds::default(),
            forest: ForestConfig::default(),
        }
    }
}

impl OverloadConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(AnalysisError::Configuration(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.forest.n_trees == 0 {
            return Err(AnalysisError::Configuration(
                "forest.n_trees must be at least 1".to_string(),
            ));
        }
        if self.min_records < 2 {
            return Err(AnalysisError::Configuration(format!(
                "min_records must be at least 2, got {}",
                self.min_records
            )));
        }
        Ok(())
    }
}

/// A completed record with every numeric model feature present
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadSample {
    pub training_type: String,
    pub intensity: Option<String>,
    pub temperature: f64,
    pub duration: f64,
    pub hr_before: f64,
    pub hr_during: f64,
    pub hr_after: f64,
    pub rating_score: Option<f64>,
}

impl OverloadSample {
    /// `None` when any numeric feature is missing
    pub fn from_record(record: &TrainingRecord) -> Option<Self> {
        Some(OverloadSample {
            training_type: record.training_type.clone(),
            intensity: record.intensity.clone(),
            temperature: record.temperature_celsius?,
            duration: record.duration?,
            hr_before: record.heart_rate_before?,
            hr_during: record.heart_rate_during?,
            hr_after: record.heart_rate_after?,
            rating_score: record.rating_score,
        })
    }

    pub fn intensity_label(&self) -> &str {
        self.intensity.as_deref().unwrap_or(encoding::MISSING_CATEGORY)
    }

    /// Supervised label; a missing rating counts as not overloaded
    pub fn is_overloaded(&self, rating_max: f64) -> bool {
        self.rating_score.map_or(false, |score| score <= rating_max)
    }
}
