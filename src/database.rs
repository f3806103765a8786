use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::models::{AnalysisType, SessionRecord, SubjectFilter, SubjectId};
use crate::report::AnalysisDocument;

/// Persistence collaborator for the analysis pipeline
///
/// Constructed once by the caller and handed to the analyzer.
pub trait SessionStore {
    /// Sessions matching the filter that carry at least one training entry
    fn fetch_sessions(&self, filter: &SubjectFilter) -> Result<Vec<SessionRecord>, DatabaseError>;

    /// Insert or fully replace the document keyed by subject and analysis type
    fn upsert_analysis(&self, document: &AnalysisDocument) -> Result<(), DatabaseError>;
}

/// A persisted analysis document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnalysis {
    pub subject_id: String,
    pub analysis_type: String,
    pub subject_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub document: serde_json::Value,
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub session_count: usize,
    pub subject_count: usize,
    pub analysis_count: usize,
}

/// SQLite-backed session and analysis store
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DatabaseError> {
        // journal_mode returns a row, so it can't go through execute()
        self.conn
            .query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        self.conn.execute("PRAGMA synchronous=NORMAL", [])?;

        // Training entries stay raw JSON: a malformed entry must not make
        // the whole session unreadable
        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                subject_id TEXT,
                subject_name TEXT,
                created_at DATETIME,
                trainings TEXT NOT NULL,
                imported_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                subject_id TEXT NOT NULL,
                analysis_type TEXT NOT NULL,
                subject_name TEXT,
                generated_at DATETIME NOT NULL,
                document TEXT NOT NULL,
                PRIMARY KEY (subject_id, analysis_type)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_subject ON sessions (subject_id, created_at)",
            [],
        )?;

        Ok(())
    }

    /// Store a session, replacing any session with the same id
    ///
    /// Sessions without an id get a fresh one.
    pub fn insert_session(&self, session: &SessionRecord) -> Result<String, DatabaseError> {
        write_session(&self.conn, session)
    }

    /// Import a JSON array of sessions in a single transaction
    pub fn import_sessions_json(&mut self, json: &str) -> Result<usize, DatabaseError> {
        let sessions: Vec<SessionRecord> = serde_json::from_str(json)?;

        let tx = self.conn.transaction()?;
        for session in &sessions {
            write_session(&tx, session)?;
        }
        tx.commit()?;

        debug!(count = sessions.len(), "Imported sessions");
        Ok(sessions.len())
    }

    /// Import sessions from a JSON file
    pub fn import_sessions_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, DatabaseError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DatabaseError::NotFound(path.display().to_string()),
            _ => DatabaseError::Io(e),
        })?;
        self.import_sessions_json(&content)
    }

    /// Load the stored document for a subject and analysis type
    pub fn load_analysis(
        &self,
        subject_id: &SubjectId,
        analysis_type: AnalysisType,
    ) -> Result<Option<StoredAnalysis>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT subject_id, analysis_type, subject_name, generated_at, document
                FROM analyses
                WHERE subject_id = ?1 AND analysis_type = ?2
                "#,
                params![subject_id.as_str(), analysis_type.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, DateTime<Utc>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((subject_id, analysis_type, subject_name, generated_at, document)) => {
                Ok(Some(StoredAnalysis {
                    subject_id,
                    analysis_type,
                    subject_name,
                    generated_at,
                    document: serde_json::from_str(&document)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Subject, analysis type and generation time of every stored document
    pub fn list_analyses(&self) -> Result<Vec<(String, String, DateTime<Utc>)>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT subject_id, analysis_type, generated_at FROM analyses ORDER BY subject_id, analysis_type",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats, DatabaseError> {
        let session_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        let subject_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT subject_id) FROM sessions",
            [],
            |row| row.get(0),
        )?;
        let analysis_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM analyses", [], |row| row.get(0))?;

        Ok(DatabaseStats {
            session_count: session_count as usize,
            subject_count: subject_count as usize,
            analysis_count: analysis_count as usize,
        })
    }

    fn session_from_row(row: &Row) -> rusqlite::Result<(SessionRecord, String)> {
        Ok((
            SessionRecord {
                id: row.get("id")?,
                subject_id: row.get("subject_id")?,
                subject_name: row.get("subject_name")?,
                created_at: row.get("created_at")?,
                trainings: Vec::new(),
            },
            row.get("trainings")?,
        ))
    }
}

/// Insert or replace one session row, generating an id when it has none
fn write_session(conn: &Connection, session: &SessionRecord) -> Result<String, DatabaseError> {
    let id = if session.id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        session.id.clone()
    };

    conn.execute(
        r#"
        INSERT OR REPLACE INTO sessions (id, subject_id, subject_name, created_at, trainings)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            id,
            session.subject_id,
            session.subject_name,
            session.created_at,
            serde_json::to_string(&session.trainings)?,
        ],
    )?;

    Ok(id)
}

impl SessionStore for Database {
    fn fetch_sessions(&self, filter: &SubjectFilter) -> Result<Vec<SessionRecord>, DatabaseError> {
        const COLUMNS: &str = "SELECT id, subject_id, subject_name, created_at, trainings FROM sessions";

        let rows = match filter {
            SubjectFilter::All => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{} ORDER BY created_at, id", COLUMNS))?;
                let rows = stmt
                    .query_map([], Self::session_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            SubjectFilter::One(subject_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} WHERE subject_id = ?1 ORDER BY created_at, id",
                    COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![subject_id.as_str()], Self::session_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        let mut sessions = Vec::with_capacity(rows.len());
        for (mut session, trainings) in rows {
            match serde_json::from_str::<Vec<serde_json::Value>>(&trainings) {
                Ok(entries) if !entries.is_empty() => {
                    session.trainings = entries;
                    sessions.push(session);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Skipping session with unreadable trainings");
                }
            }
        }

        Ok(sessions)
    }

    fn upsert_analysis(&self, document: &AnalysisDocument) -> Result<(), DatabaseError> {
        let json = document.to_json()?;

        self.conn.execute(
            r#"
            INSERT INTO analyses (subject_id, analysis_type, subject_name, generated_at, document)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (subject_id, analysis_type) DO UPDATE SET
                subject_name = excluded.subject_name,
                generated_at = excluded.generated_at,
                document = excluded.document
            "#,
            params![
                document.subject_id.as_str(),
                document.analysis_type.as_str(),
                document.subject_name,
                document.generated_at,
                json,
            ],
        )?;

        Ok(())
    }
}
