// Library interface for Equitrain
// The CLI and the integration tests both go through these modules

pub mod analysis;
pub mod config;
pub mod database;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod overload;
pub mod report;
pub mod summary;
pub mod trends;

// Re-export commonly used types for convenience
pub use analysis::{Analyzer, BasicAnalysisReport, SubjectReport};
pub use config::AppConfig;
pub use database::{Database, SessionStore, StoredAnalysis};
pub use error::{AnalysisError, AnalysisOutcome, DatabaseError, EmptyReason, Result};
pub use extractor::{Extraction, RecordExtractor};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use overload::{OverloadClassifier, OverloadConfig, OverloadStats};
pub use report::{AnalysisBody, AnalysisDocument};
pub use summary::{SummaryAggregator, SummaryEntry};
pub use trends::{TrendCalculator, TrendReport};
