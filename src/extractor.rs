//! Record extraction
//!
//! Turns stored sessions into flat [`TrainingRecord`]s. Only completed,
//! typed entries from sessions with an owner and a timestamp survive.
//! A malformed entry is skipped and counted; it never aborts the batch.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::{
    FeatureSet, SessionRecord, SubjectId, TrainingEntry, TrainingRecord, UNKNOWN_SUBJECT_NAME,
};

/// Records pulled out of a batch of sessions, plus bookkeeping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<TrainingRecord>,

    /// Latest known display name per subject
    pub subject_names: BTreeMap<SubjectId, String>,

    pub sessions_seen: usize,
    /// Sessions without an owner or a timestamp
    pub sessions_skipped: usize,
    /// Entries that are not completed or carry no training type
    pub entries_ineligible: usize,
    /// Entries that could not be converted
    pub entries_malformed: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Display name for a subject, "Unknown" if none was recorded
    pub fn subject_name(&self, subject_id: &SubjectId) -> String {
        self.subject_names
            .get(subject_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SUBJECT_NAME.to_string())
    }
}

/// Normalizes raw sessions into analytic records
pub struct RecordExtractor {
    feature_set: FeatureSet,
}

impl RecordExtractor {
    pub fn new(feature_set: FeatureSet) -> Self {
        RecordExtractor { feature_set }
    }

    /// Extract every eligible record from the given sessions
    pub fn extract(&self, sessions: &[SessionRecord]) -> Extraction {
        let mut extraction = Extraction::default();

        for session in sessions {
            extraction.sessions_seen += 1;

            let subject_id = match session
                .subject_id
                .as_deref()
                .and_then(|raw| SubjectId::parse(raw).ok())
            {
                Some(id) => id,
                None => {
                    debug!(session_id = %session.id, "Skipping session without a valid subject id");
                    extraction.sessions_skipped += 1;
                    continue;
                }
            };

            let subject_name = session
                .subject_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_SUBJECT_NAME.to_string());
            extraction
                .subject_names
                .insert(subject_id.clone(), subject_name.clone());

            let created_at = match session.created_at {
                Some(ts) => ts,
                None => {
                    debug!(session_id = %session.id, "Skipping session without createdAt");
                    extraction.sessions_skipped += 1;
                    continue;
                }
            };

            for (index, raw) in session.trainings.iter().enumerate() {
                let entry = match parse_entry(&session.id, index, raw) {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(error = %err, "Skipping malformed training entry");
                        extraction.entries_malformed += 1;
                        continue;
                    }
                };

                if !entry.is_eligible() {
                    extraction.entries_ineligible += 1;
                    continue;
                }

                extraction.records.push(self.normalize(
                    entry,
                    &subject_id,
                    &subject_name,
                    created_at,
                ));
            }
        }

        debug!(
            sessions = extraction.sessions_seen,
            records = extraction.records.len(),
            malformed = extraction.entries_malformed,
            ineligible = extraction.entries_ineligible,
            "Extraction finished"
        );

        extraction
    }

    fn normalize(
        &self,
        entry: TrainingEntry,
        subject_id: &SubjectId,
        subject_name: &str,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> TrainingRecord {
        let overload = self.feature_set == FeatureSet::Overload;

        TrainingRecord {
            subject_id: subject_id.clone(),
            subject_name: subject_name.to_string(),
            training_type: entry.training_type.unwrap_or_default(),
            created_at,
            heart_rate_before: entry.heart_rate_before,
            heart_rate_during: entry.heart_rate_during,
            heart_rate_after: entry.heart_rate_after,
            temperature_celsius: entry.temperature_celsius,
            duration: entry.duration.filter(|_| overload),
            intensity: entry.intensity.filter(|_| overload),
            rating_score: entry.rating_score.filter(|_| overload),
        }
    }
}

fn parse_entry(
    session_id: &str,
    index: usize,
    raw: &serde_json::Value,
) -> Result<TrainingEntry, ExtractionError> {
    let entry: TrainingEntry =
        serde_json::from_value(raw.clone()).map_err(|e| ExtractionError::Malformed {
            session_id: session_id.to_string(),
            index,
            reason: e.to_string(),
        })?;

    for (field, value) in [
        ("heartRateBefore", entry.heart_rate_before),
        ("heartRateDuring", entry.heart_rate_during),
        ("heartRateAfter", entry.heart_rate_after),
        ("temperatureCelsius", entry.temperature_celsius),
        ("duration", entry.duration),
        ("ratingScore", entry.rating_score),
    ] {
        if value.map_or(false, |v| !v.is_finite()) {
            return Err(ExtractionError::Malformed {
                session_id: session_id.to_string(),
                index,
                reason: format!("{} is not a finite number", field),
            });
        }
    }

    Ok(entry)
}
