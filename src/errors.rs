use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RollCallError>;

#[derive(Debug, Error)]
pub enum RollCallError {
    /// Rejected operation: terminal record or malformed request.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("roll-call session {0} not found")]
    SessionNotFound(i64),

    #[error("student {student_id} has no record in session {session_id}")]
    RecordNotFound { session_id: i64, student_id: String },

    #[error("scope {scope} already has open session {session_id}")]
    ActiveSessionExists { scope: String, session_id: i64 },

    #[error("student {student_id} has no approved leave for {scope} on {date}")]
    LeaveNotApproved {
        student_id: String,
        scope: String,
        date: NaiveDate,
    },

    #[error(
        "correction window expired for student {student_id}: {elapsed_secs}s elapsed, window is {window_secs}s"
    )]
    CorrectionWindowExpired {
        student_id: String,
        elapsed_secs: i64,
        window_secs: i64,
    },

    #[error("roll-call session {0} is already closed")]
    SessionAlreadyClosed(i64),

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("migration to version {version} failed: {source}")]
    Migration {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RollCallError {
    /// Infrastructure failures. The session keeps its last committed state, so
    /// the operation can be retried.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            RollCallError::Storage(_) | RollCallError::Pool(_) | RollCallError::Migration { .. }
        )
    }
}
