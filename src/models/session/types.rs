use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::text_enum;

text_enum! {
    /// Whether the whole roster or a subset of it is called.
    pub enum SessionMode {
        Full => "full",
        RandomSubset => "random-subset",
    }
}

text_enum! {
    /// Ordering applied to the roster before the subset is taken.
    pub enum SelectionStrategy {
        Random => "random",
        MostAbsencesFirst => "most-absences-first",
        LeastCalledFirst => "least-called-first",
    }
}

text_enum! {
    pub enum SessionStatus {
        Open => "open",
        Closed => "closed",
    }
}

text_enum! {
    pub enum CloseReason {
        /// Every selected student received a marking.
        Completed => "completed",
        /// The operator ended the session early.
        Forced => "forced",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollCallSession {
    pub id: i64,
    pub scope: String,
    pub session_date: NaiveDate,
    pub mode: SessionMode,
    pub subset_size: i64,
    pub strategy: SelectionStrategy,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub close_reason: Option<CloseReason>,
}

impl RollCallSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub scope: String,
    pub session_date: NaiveDate,
    pub mode: SessionMode,
    pub subset_size: i64,
    pub strategy: SelectionStrategy,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionCriteria {
    pub scope: Option<String>,
    pub status: Option<SessionStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// One row of the session overview with per-status record counts.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: i64,
    pub scope: String,
    pub session_date: NaiveDate,
    pub mode: SessionMode,
    pub strategy: SelectionStrategy,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub record_count: i64,
    pub not_called: i64,
    pub present: i64,
    pub leave: i64,
    pub absent: i64,
    pub late: i64,
}
