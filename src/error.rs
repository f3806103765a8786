//! Unified error hierarchy for Equitrain
//!
//! Batch-level failures (persistence, invalid caller input) surface as
//! [`AnalysisError`]. Per-entry conversion problems are [`ExtractionError`]s,
//! which the extractor absorbs. "No data" is not an error at all: it is the
//! [`AnalysisOutcome::Empty`] variant.

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for all analysis entry points
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Persistence read or write failed
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] DatabaseError),

    /// Missing or malformed caller input (e.g. subject identifier)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration values out of range
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The overload model could not be fit or applied
    #[error("Model error: {0}")]
    Model(String),
}

/// Persistence collaborator errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DatabaseError {
    fn from(error: serde_json::Error) -> Self {
        DatabaseError::Serialization(error.to_string())
    }
}

/// A single training entry that could not be normalized
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Malformed training entry {index} in session {session_id}: {reason}")]
    Malformed {
        session_id: String,
        index: usize,
        reason: String,
    },
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::Connectivity(DatabaseError::Sqlite(_)))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AnalysisError::InvalidInput(_) => ErrorSeverity::Warning,
            AnalysisError::Connectivity(DatabaseError::NotFound(_)) => ErrorSeverity::Warning,
            AnalysisError::Connectivity(_) => ErrorSeverity::Error,
            AnalysisError::Configuration(_) => ErrorSeverity::Error,
            AnalysisError::Model(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Connectivity(DatabaseError::Sqlite(_)) => {
                "Unable to reach the training database. Please check your configuration.".to_string()
            }
            AnalysisError::InvalidInput(reason) => {
                format!("The request could not be processed: {}", reason)
            }
            _ => self.to_string(),
        }
    }

    /// Log the error at its severity and return the text to show the user
    pub fn report(&self) -> String {
        let retryable = self.is_retryable();
        if self.severity().to_tracing_level() == tracing::Level::ERROR {
            tracing::error!(error = %self, retryable, "Analysis failed");
        } else {
            tracing::warn!(error = %self, retryable, "Analysis rejected");
        }

        let mut message = self.user_message();
        if retryable {
            message.push_str(" The command can be retried.");
        }
        message
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

/// Why an analysis produced no document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum EmptyReason {
    /// The store returned no candidate sessions
    NoSessions,
    /// Sessions existed but none had a completed, typed training entry
    NoEligibleRecords,
    /// Fewer usable records than the model needs
    #[serde(rename_all = "camelCase")]
    InsufficientRecords { usable: usize, required: usize },
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyReason::NoSessions => write!(f, "no training sessions found"),
            EmptyReason::NoEligibleRecords => write!(f, "no completed training entries"),
            EmptyReason::InsufficientRecords { usable, required } => write!(
                f,
                "only {} usable training entries, at least {} required",
                usable, required
            ),
        }
    }
}

/// Outcome of an analysis run that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome<T> {
    Success(T),
    Empty(EmptyReason),
}

impl<T> AnalysisOutcome<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, AnalysisOutcome::Empty(_))
    }

    /// Borrow the successful value, if any
    pub fn success(&self) -> Option<&T> {
        match self {
            AnalysisOutcome::Success(value) => Some(value),
            AnalysisOutcome::Empty(_) => None,
        }
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            AnalysisOutcome::Success(value) => Some(value),
            AnalysisOutcome::Empty(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = AnalysisError::InvalidInput("missing subject".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = AnalysisError::Connectivity(DatabaseError::Serialization("bad".to_string()));
        assert_eq!(err.severity(), ErrorSeverity::Error);

        let err = AnalysisError::Model("no trees".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_error_retryable() {
        let err = AnalysisError::Connectivity(DatabaseError::Sqlite(
            rusqlite::Error::InvalidQuery,
        ));
        assert!(err.is_retryable());

        let err = AnalysisError::InvalidInput("test".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = AnalysisError::InvalidInput("subject id is required".to_string());
        assert!(err.user_message().contains("subject id is required"));
    }

    #[test]
    fn test_report_adds_retry_hint() {
        let err = AnalysisError::Connectivity(DatabaseError::Sqlite(
            rusqlite::Error::InvalidQuery,
        ));
        let message = err.report();
        assert!(message.starts_with("Unable to reach the training database."));
        assert!(message.ends_with("can be retried."));

        let err = AnalysisError::InvalidInput("bad id".to_string());
        assert_eq!(err.report(), "The request could not be processed: bad id");
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome: AnalysisOutcome<u32> = AnalysisOutcome::Success(3);
        assert_eq!(outcome.success(), Some(&3));
        assert!(!outcome.is_empty());

        let empty: AnalysisOutcome<u32> = AnalysisOutcome::Empty(EmptyReason::NoSessions);
        assert!(empty.is_empty());
        assert_eq!(empty.into_success(), None);
    }

    #[test]
    fn test_empty_reason_display() {
        let reason = EmptyReason::InsufficientRecords { usable: 3, required: 5 };
        assert_eq!(
            reason.to_string(),
            "only 3 usable training entries, at least 5 required"
        );
    }
}
