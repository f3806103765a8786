use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalysisError;

/// Status a training entry must carry to be analyzed
pub const COMPLETED_STATUS: &str = "Completed";

/// Display name used when a session carries no subject name
pub const UNKNOWN_SUBJECT_NAME: &str = "Unknown";

const MAX_SUBJECT_ID_LEN: usize = 64;

/// Validated identifier of an analyzed subject (horse)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Parse a caller-supplied identifier
    ///
    /// Identifiers are opaque, but must be non-empty, at most 64 characters
    /// and limited to ASCII letters, digits, `-` and `_`.
    pub fn parse(raw: &str) -> Result<Self, AnalysisError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "subject id is required".to_string(),
            ));
        }
        if trimmed.len() > MAX_SUBJECT_ID_LEN {
            return Err(AnalysisError::InvalidInput(format!(
                "subject id is longer than {} characters",
                MAX_SUBJECT_ID_LEN
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AnalysisError::InvalidInput(format!(
                "subject id contains invalid characters: {}",
                trimmed
            )));
        }
        Ok(SubjectId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which subjects a session fetch covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectFilter {
    All,
    One(SubjectId),
}

/// Which fields the extractor keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSet {
    /// Heart rates and temperature
    Basic,
    /// Basic fields plus duration, intensity and rating
    Overload,
}

/// Type of persisted analysis document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisType {
    #[serde(rename = "training_summary")]
    TrainingSummary,
    #[serde(rename = "overload")]
    Overload,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::TrainingSummary => "training_summary",
            AnalysisType::Overload => "overload",
        }
    }
}

impl std::str::FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training_summary" | "summary" | "basic" => Ok(AnalysisType::TrainingSummary),
            "overload" => Ok(AnalysisType::Overload),
            _ => Err(format!("Unknown analysis type: {}", s)),
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded visit containing one or more training entries, as stored
///
/// Training entries are kept as raw JSON so that one malformed entry does
/// not make the whole session unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Session identifier
    #[serde(default)]
    pub id: String,

    /// Owning subject
    #[serde(alias = "horseId")]
    pub subject_id: Option<String>,

    /// Subject display name at the time of the session
    #[serde(alias = "horseName")]
    pub subject_name: Option<String>,

    /// When the session was recorded
    pub created_at: Option<DateTime<Utc>>,

    /// Raw training entries
    #[serde(default)]
    pub trainings: Vec<serde_json::Value>,
}

/// One training entry as recorded inside a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingEntry {
    pub training_status: Option<String>,
    pub training_type: Option<String>,

    /// Heart rate before the exercise (bpm)
    pub heart_rate_before: Option<f64>,
    /// Heart rate during the exercise (bpm)
    pub heart_rate_during: Option<f64>,
    /// Heart rate after the exercise (bpm)
    pub heart_rate_after: Option<f64>,

    /// Ambient temperature in degrees Celsius
    pub temperature_celsius: Option<f64>,

    /// Exercise duration in minutes
    pub duration: Option<f64>,

    /// Categorical intensity ("Low", "Medium", "High", ...)
    pub intensity: Option<String>,

    /// Post-training rating; low scores indicate a struggling subject
    pub rating_score: Option<f64>,
}

impl TrainingEntry {
    /// Completed entries with a non-empty training type are analyzable
    pub fn is_eligible(&self) -> bool {
        self.training_status.as_deref() == Some(COMPLETED_STATUS)
            && self
                .training_type
                .as_deref()
                .map_or(false, |t| !t.trim().is_empty())
    }
}

/// Normalized unit of analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub training_type: String,
    pub created_at: DateTime<Utc>,

    pub heart_rate_before: Option<f64>,
    pub heart_rate_during: Option<f64>,
    pub heart_rate_after: Option<f64>,
    pub temperature_celsius: Option<f64>,

    // Overload feature set only
    pub duration: Option<f64>,
    pub intensity: Option<String>,
    pub rating_score: Option<f64>,
}
