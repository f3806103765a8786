//! Analysis entry points
//!
//! Two independent paths share extraction and assembly:
//!
//! - basic: extract → summary + trends → one `training_summary` document per subject
//! - overload: extract → rule/model classification → one `overload` document
//!
//! Each call is a self-contained batch. "Now" is captured once per run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::database::SessionStore;
use crate::error::{AnalysisError, AnalysisOutcome, EmptyReason, Result};
use crate::extractor::RecordExtractor;
use crate::models::{FeatureSet, SubjectFilter, SubjectId, UNKNOWN_SUBJECT_NAME};
use crate::overload::{OverloadClassifier, OverloadConfig, OverloadStats};
use crate::report::AnalysisDocument;
use crate::summary::{group_by_subject_and_type, SummaryAggregator};
use crate::trends::{TrendCalculator, DEFAULT_WINDOW_DAYS};

/// What one basic-analysis run wrote, per subject
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectReport {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub training_types: usize,
    pub records: usize,
}

/// Outcome details of a basic-analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAnalysisReport {
    pub subjects: Vec<SubjectReport>,
    pub sessions_seen: usize,
    pub records_used: usize,
    pub entries_malformed: usize,
    pub entries_ineligible: usize,
}

/// Runs analyses against an injected session store
pub struct Analyzer<'a, S: SessionStore + ?Sized> {
    store: &'a S,
    window_days: i64,
    overload: OverloadConfig,
}

impl<'a, S: SessionStore + ?Sized> Analyzer<'a, S> {
    /// Analyzer with default settings
    pub fn new(store: &'a S) -> Self {
        Analyzer {
            store,
            window_days: DEFAULT_WINDOW_DAYS,
            overload: OverloadConfig::default(),
        }
    }

    /// Analyzer using the trend and overload sections of the app config
    pub fn from_config(store: &'a S, config: &AppConfig) -> Self {
        Analyzer {
            store,
            window_days: config.trends.window_days,
            overload: config.overload.clone(),
        }
    }

    /// Summary and trend analysis for one subject, or all when `subject` is `None`
    pub fn run_basic_analysis(
        &self,
        subject: Option<&str>,
    ) -> Result<AnalysisOutcome<BasicAnalysisReport>> {
        self.run_basic_analysis_at(subject, Utc::now())
    }

    /// Same as [`Self::run_basic_analysis`] with an explicit reference instant
    pub fn run_basic_analysis_at(
        &self,
        subject: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisOutcome<BasicAnalysisReport>> {
        let filter = match subject {
            Some(raw) => SubjectFilter::One(SubjectId::parse(raw)?),
            None => SubjectFilter::All,
        };

        let sessions = self.store.fetch_sessions(&filter)?;
        if sessions.is_empty() {
            info!(?filter, "No training sessions match");
            return Ok(AnalysisOutcome::Empty(EmptyReason::NoSessions));
        }
        info!(sessions = sessions.len(), "Processing training sessions");

        let extraction = RecordExtractor::new(FeatureSet::Basic).extract(&sessions);
        if extraction.is_empty() {
            return Ok(AnalysisOutcome::Empty(EmptyReason::NoEligibleRecords));
        }

        let trends = TrendCalculator::with_window_days(now, self.window_days);
        let mut subjects = Vec::new();

        for (subject_id, records_by_type) in group_by_subject_and_type(&extraction.records) {
            let summary = SummaryAggregator::compute_summary(&records_by_type);
            let trend = trends.compute_trends(&records_by_type);
            let subject_name = extraction.subject_name(&subject_id);

            let report = SubjectReport {
                subject_id: subject_id.clone(),
                subject_name: subject_name.clone(),
                training_types: records_by_type.len(),
                records: records_by_type.values().map(Vec::len).sum(),
            };

            let document =
                AnalysisDocument::training_summary(subject_id, subject_name, summary, trend, now);

            // Writes are independent per subject; stop at the first failure
            if let Err(e) = self.store.upsert_analysis(&document) {
                error!(subject = %document.subject_id, error = %e, "Failed to store training summary");
                return Err(AnalysisError::Connectivity(e));
            }
            info!(
                subject = %document.subject_id,
                name = %document.subject_name,
                "Training summary stored"
            );
            subjects.push(report);
        }

        Ok(AnalysisOutcome::Success(BasicAnalysisReport {
            subjects,
            sessions_seen: extraction.sessions_seen,
            records_used: extraction.records.len(),
            entries_malformed: extraction.entries_malformed,
            entries_ineligible: extraction.entries_ineligible,
        }))
    }

    /// Overload classification for one subject
    ///
    /// A missing or malformed subject id is an [`AnalysisError::InvalidInput`].
    /// Insufficient data yields [`AnalysisOutcome::Empty`] and writes nothing.
    pub fn run_overload_analysis(
        &self,
        subject: Option<&str>,
    ) -> Result<AnalysisOutcome<OverloadStats>> {
        self.run_overload_analysis_at(subject, Utc::now())
    }

    /// Same as [`Self::run_overload_analysis`] with an explicit generation time
    pub fn run_overload_analysis_at(
        &self,
        subject: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisOutcome<OverloadStats>> {
        let subject_id = match subject {
            Some(raw) => SubjectId::parse(raw)?,
            None => {
                return Err(AnalysisError::InvalidInput(
                    "subject id is required for overload analysis".to_string(),
                ))
            }
        };

        let sessions = self
            .store
            .fetch_sessions(&SubjectFilter::One(subject_id.clone()))?;
        info!(subject = %subject_id, sessions = sessions.len(), "Found training sessions");
        if sessions.is_empty() {
            return Ok(AnalysisOutcome::Empty(EmptyReason::NoSessions));
        }

        let extraction = RecordExtractor::new(FeatureSet::Overload).extract(&sessions);
        let classifier = OverloadClassifier::with_config(self.overload.clone());

        let analysis = match classifier.classify(&extraction.records)? {
            AnalysisOutcome::Success(analysis) => analysis,
            AnalysisOutcome::Empty(reason) => {
                warn!(subject = %subject_id, %reason, "Not enough data for overload analysis");
                return Ok(AnalysisOutcome::Empty(reason));
            }
        };

        let stats = analysis.stats.clone();
        // Overload documents are labelled from the first fetched session
        let subject_name = sessions[0]
            .subject_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_SUBJECT_NAME.to_string());
        let document = AnalysisDocument::overload(subject_id, subject_name, analysis, now);
        self.store.upsert_analysis(&document)?;

        info!(
            subject = %document.subject_id,
            total = stats.total,
            overloaded = stats.overloaded_count,
            ok = stats.ok_count,
            "Overload analysis stored"
        );

        Ok(AnalysisOutcome::Success(stats))
    }
}
