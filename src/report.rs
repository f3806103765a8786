//! Result assembly
//!
//! Packages computed sections into the document persisted per
//! `(subject, analysis type)`. Each run's document fully replaces the last.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AnalysisType, SubjectId};
use crate::overload::{OverloadAnalysis, OverloadDetail, OverloadStats};
use crate::summary::SummaryEntry;
use crate::trends::TrendReport;

/// Analysis-specific sections of a document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisBody {
    TrainingSummary {
        summary: Vec<SummaryEntry>,
        trend: TrendReport,
    },
    Overload {
        stats: OverloadStats,
        details: Vec<OverloadDetail>,
    },
}

/// The persisted artifact of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDocument {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub analysis_type: AnalysisType,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: AnalysisBody,
}

impl AnalysisDocument {
    /// Summary and trend document for the basic analysis
    pub fn training_summary(
        subject_id: SubjectId,
        subject_name: String,
        summary: Vec<SummaryEntry>,
        trend: TrendReport,
        generated_at: DateTime<Utc>,
    ) -> Self {
        AnalysisDocument {
            subject_id,
            subject_name,
            analysis_type: AnalysisType::TrainingSummary,
            generated_at,
            body: AnalysisBody::TrainingSummary { summary, trend },
        }
    }

    /// Verdict document for the overload analysis
    pub fn overload(
        subject_id: SubjectId,
        subject_name: String,
        analysis: OverloadAnalysis,
        generated_at: DateTime<Utc>,
    ) -> Self {
        AnalysisDocument {
            subject_id,
            subject_name,
            analysis_type: AnalysisType::Overload,
            generated_at,
            body: AnalysisBody::Overload {
                stats: analysis.stats,
                details: analysis.details,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
