//! Deterministic overload rules
//!
//! A record is rule-flagged when any single rule holds. A rule whose inputs
//! are missing simply does not hold.

use serde::{Deserialize, Serialize};

use crate::models::TrainingRecord;

/// Thresholds for the rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Post-exercise heart rate at or above this is overload (bpm)
    pub hr_after_max: f64,

    /// `hr_after - hr_during` at or above this means recovery has not begun (bpm)
    pub recovery_delta_min: f64,

    /// Session length considered long (minutes)
    pub long_duration: f64,

    /// Intensities that make a long session overloading
    pub loaded_intensities: Vec<String>,

    /// Ambient temperature considered hot (degrees Celsius)
    pub hot_temperature: f64,

    /// Post-exercise heart rate that is overload in hot conditions (bpm)
    pub hot_hr_after: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        RuleThresholds {
            hr_after_max: 150.0,
            recovery_delta_min: -10.0,
            long_duration: 60.0,
            loaded_intensities: vec!["Medium".to_string(), "High".to_string()],
            hot_temperature: 30.0,
            hot_hr_after: 140.0,
        }
    }
}

/// Individual overload rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverloadRule {
    HighHeartRateAfter,
    NoRecovery,
    LongLoadedSession,
    HeatStress,
}

impl OverloadRule {
    pub const ALL: [OverloadRule; 4] = [
        OverloadRule::HighHeartRateAfter,
        OverloadRule::NoRecovery,
        OverloadRule::LongLoadedSession,
        OverloadRule::HeatStress,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            OverloadRule::HighHeartRateAfter => "Heart rate after training is too high",
            OverloadRule::NoRecovery => "Heart rate has not started to recover",
            OverloadRule::LongLoadedSession => "Long session at medium or high intensity",
            OverloadRule::HeatStress => "Elevated heart rate after training in hot conditions",
        }
    }
}

/// Stateless evaluator for the rule set
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    thresholds: RuleThresholds,
}

impl RuleEvaluator {
    pub fn new(thresholds: RuleThresholds) -> Self {
        RuleEvaluator { thresholds }
    }

    /// Check a single rule against a record
    pub fn holds(&self, rule: OverloadRule, record: &TrainingRecord) -> bool {
        let t = &self.thresholds;
        match rule {
            OverloadRule::HighHeartRateAfter => record
                .heart_rate_after
                .map_or(false, |after| after >= t.hr_after_max),
            OverloadRule::NoRecovery => match (record.heart_rate_after, record.heart_rate_during) {
                (Some(after), Some(during)) => after - during >= t.recovery_delta_min,
                _ => false,
            },
            OverloadRule::LongLoadedSession => match (record.duration, record.intensity.as_deref()) {
                (Some(duration), Some(intensity)) => {
                    duration >= t.long_duration
                        && t.loaded_intensities.iter().any(|i| i == intensity)
                }
                _ => false,
            },
            OverloadRule::HeatStress => {
                match (record.temperature_celsius, record.heart_rate_after) {
                    (Some(temp), Some(after)) => {
                        temp >= t.hot_temperature && after >= t.hot_hr_after
                    }
                    _ => false,
                }
            }
        }
    }

    /// Every rule that holds for the record
    pub fn triggered(&self, record: &TrainingRecord) -> Vec<OverloadRule> {
        OverloadRule::ALL
            .iter()
            .copied()
            .filter(|rule| self.holds(*rule, record))
            .collect()
    }

    pub fn is_flagged(&self, record: &TrainingRecord) -> bool {
        OverloadRule::ALL.iter().any(|rule| self.holds(*rule, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectId;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn record(
        during: Option<f64>,
        after: Option<f64>,
        duration: Option<f64>,
        intensity: Option<&str>,
        temperature: Option<f64>,
    ) -> TrainingRecord {
        TrainingRecord {
            subject_id: SubjectId::parse("h1").unwrap(),
            subject_name: "Bella".to_string(),
            training_type: "Jumping".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            heart_rate_before: Some(40.0),
            heart_rate_during: during,
            heart_rate_after: after,
            temperature_celsius: temperature,
            duration,
            intensity: intensity.map(str::to_string),
            rating_score: None,
        }
    }

    #[test]
    fn test_high_heart_rate_after_flags() {
        let evaluator = RuleEvaluator::default();
        let r = record(Some(140.0), Some(155.0), Some(45.0), Some("Low"), Some(20.0));

        assert!(evaluator.is_flagged(&r));
        assert!(evaluator.triggered(&r).contains(&OverloadRule::HighHeartRateAfter));
    }

    #[test]
    fn test_every_rule_has_its_own_description() {
        let mut descriptions: Vec<&str> =
            OverloadRule::ALL.iter().map(|rule| rule.description()).collect();
        descriptions.sort();
        descriptions.dedup();
        assert_eq!(descriptions.len(), OverloadRule::ALL.len());
        assert!(OverloadRule::HeatStress.description().contains("hot"));
    }

    #[test]
    fn test_recovery_rule() {
        let evaluator = RuleEvaluator::default();
        // 125 - 140 = -15: recovering
        let recovering = record(Some(140.0), Some(125.0), None, None, None);
        assert!(!evaluator.holds(OverloadRule::NoRecovery, &recovering));

        // 130 - 140 = -10: boundary counts as not recovering
        let boundary = record(Some(140.0), Some(130.0), None, None, None);
        assert!(evaluator.holds(OverloadRule::NoRecovery, &boundary));
    }

    #[test]
    fn test_long_loaded_session() {
        let evaluator = RuleEvaluator::default();
        let high = record(Some(140.0), Some(100.0), Some(60.0), Some("High"), None);
        let low = record(Some(140.0), Some(100.0), Some(90.0), Some("Low"), None);
        let short = record(Some(140.0), Some(100.0), Some(59.0), Some("Medium"), None);

        assert_eq!(evaluator.triggered(&high), vec![OverloadRule::LongLoadedSession]);
        assert!(!evaluator.is_flagged(&low));
        assert!(!evaluator.is_flagged(&short));
    }

    #[test]
    fn test_heat_stress() {
        let evaluator = RuleEvaluator::default();
        let hot = record(Some(160.0), Some(142.0), None, None, Some(31.0));
        let mild = record(Some(160.0), Some(142.0), None, None, Some(25.0));

        assert_eq!(evaluator.triggered(&hot), vec![OverloadRule::HeatStress]);
        assert!(!evaluator.is_flagged(&mild));
    }

    #[test]
    fn test_missing_fields_never_flag() {
        let evaluator = RuleEvaluator::default();
        let empty = record(None, None, None, None, None);
        assert!(!evaluator.is_flagged(&empty));
        assert!(evaluator.triggered(&empty).is_empty());
    }

    proptest! {
        #[test]
        fn test_rule_flag_monotone_in_heart_rate_after(
            during in 60.0f64..220.0,
            after in 40.0f64..200.0,
            bump in 0.0f64..60.0,
            duration in 0.0f64..120.0,
            temperature in -5.0f64..40.0,
            loaded in proptest::bool::ANY,
        ) {
            let evaluator = RuleEvaluator::default();
            let intensity = if loaded { "High" } else { "Low" };
            let base = record(Some(during), Some(after), Some(duration), Some(intensity), Some(temperature));
            let raised = record(Some(during), Some(after + bump), Some(duration), Some(intensity), Some(temperature));

            // Every rule is monotone in heart rate after, so the flag can only turn on
            prop_assert!(!evaluator.is_flagged(&base) || evaluator.is_flagged(&raised));
            prop_assert_eq!(
                evaluator.is_flagged(&base),
                !evaluator.triggered(&base).is_empty()
            );
        }

        #[test]
        fn test_satisfying_any_rule_flags(
            during in 60.0f64..220.0,
            duration in 60.0f64..180.0,
        ) {
            let evaluator = RuleEvaluator::default();
            // Recovery well under way and cool weather: only the duration rule can hold
            let r = record(Some(during), Some(during - 30.0), Some(duration), Some("Medium"), Some(10.0));
            prop_assume!(during - 30.0 < 140.0);
            prop_assert!(evaluator.is_flagged(&r));
        }
    }
}
