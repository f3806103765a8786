//! Error paths of the analysis entry points
//!
//! Uses an in-test store whose reads or writes can be made to fail.

use std::cell::RefCell;

use chrono::{Duration, TimeZone, Utc};
use equitrain::error::ErrorSeverity;
use equitrain::{
    AnalysisDocument, AnalysisError, Analyzer, DatabaseError, SessionRecord, SessionStore,
    SubjectFilter,
};
use serde_json::json;

#[derive(Default)]
struct FlakyStore {
    sessions: Vec<SessionRecord>,
    fail_reads: bool,
    fail_writes_after: Option<usize>,
    written: RefCell<Vec<AnalysisDocument>>,
}

impl SessionStore for FlakyStore {
    fn fetch_sessions(&self, filter: &SubjectFilter) -> Result<Vec<SessionRecord>, DatabaseError> {
        if self.fail_reads {
            return Err(DatabaseError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(self
            .sessions
            .iter()
            .filter(|s| match filter {
                SubjectFilter::All => true,
                SubjectFilter::One(id) => s.subject_id.as_deref() == Some(id.as_str()),
            })
            .cloned()
            .collect())
    }

    fn upsert_analysis(&self, document: &AnalysisDocument) -> Result<(), DatabaseError> {
        let mut written = self.written.borrow_mut();
        if self.fail_writes_after.map_or(false, |limit| written.len() >= limit) {
            return Err(DatabaseError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        written.push(document.clone());
        Ok(())
    }
}

fn sessions(horses: &[&str]) -> Vec<SessionRecord> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    horses
        .iter()
        .enumerate()
        .flat_map(|(h, horse)| {
            (0..6).map(move |i| {
                let hr_after = if i == 2 { 160 } else { 90 };
                let rating = if i % 2 == 0 { 2 } else { 5 };
                SessionRecord {
                    id: format!("{}-{}", horse, i),
                    subject_id: Some(horse.to_string()),
                    subject_name: Some(format!("Horse {}", h)),
                    created_at: Some(start + Duration::days(i)),
                    trainings: vec![json!({
                        "trainingStatus": "Completed",
                        "trainingType": "Jumping",
                        "heartRateBefore": 40,
                        "heartRateDuring": 125 + i,
                        "heartRateAfter": hr_after,
                        "temperatureCelsius": 17,
                        "duration": 30,
                        "intensity": "Medium",
                        "ratingScore": rating
                    })],
                }
            })
        })
        .collect()
}

#[test]
fn test_missing_subject_is_invalid_input() {
    let store = FlakyStore::default();
    let analyzer = Analyzer::new(&store);

    let err = analyzer.run_overload_analysis(None).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
    assert_eq!(err.severity(), ErrorSeverity::Warning);

    let err = analyzer.run_overload_analysis(Some("   ")).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));

    let err = analyzer.run_basic_analysis(Some("bad id!")).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
    assert!(store.written.borrow().is_empty());
}

#[test]
fn test_read_failure_is_connectivity() {
    let store = FlakyStore {
        sessions: sessions(&["h1"]),
        fail_reads: true,
        ..Default::default()
    };

    let err = Analyzer::new(&store).run_basic_analysis(None).unwrap_err();
    assert!(matches!(err, AnalysisError::Connectivity(_)));
    assert!(err.is_retryable());

    let err = Analyzer::new(&store)
        .run_overload_analysis(Some("h1"))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Connectivity(_)));
}

#[test]
fn test_write_failure_stops_basic_run() {
    let store = FlakyStore {
        sessions: sessions(&["h1", "h2", "h3"]),
        fail_writes_after: Some(1),
        ..Default::default()
    };

    let err = Analyzer::new(&store).run_basic_analysis(None).unwrap_err();
    assert!(matches!(err, AnalysisError::Connectivity(DatabaseError::Sqlite(_))));

    let written = store.written.borrow();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].subject_id.as_str(), "h1");
}

#[test]
fn test_write_failure_fails_overload_run() {
    let store = FlakyStore {
        sessions: sessions(&["h1"]),
        fail_writes_after: Some(0),
        ..Default::default()
    };

    let err = Analyzer::new(&store)
        .run_overload_analysis(Some("h1"))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Connectivity(_)));
    assert!(err.user_message().contains("training database"));
}

#[test]
fn test_successful_runs_write_through_the_store() {
    let store = FlakyStore {
        sessions: sessions(&["h1", "h2"]),
        ..Default::default()
    };
    let analyzer = Analyzer::new(&store);

    let report = analyzer.run_basic_analysis(None).unwrap().into_success().unwrap();
    assert_eq!(report.subjects.len(), 2);

    let stats = analyzer
        .run_overload_analysis(Some("h2"))
        .unwrap()
        .into_success()
        .unwrap();
    assert_eq!(stats.total, 6);
    assert!(stats.rule_flagged >= 1);

    let written = store.written.borrow();
    assert_eq!(written.len(), 3);
    assert_eq!(written[2].subject_name, "Horse 1");
}
