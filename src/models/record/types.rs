use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::text_enum;

text_enum! {
    /// Attendance state of one student within one session.
    pub enum RecordStatus {
        NotCalled => "not-called",
        Present => "present",
        Leave => "leave",
        Absent => "absent",
        Late => "late",
    }
}

/// One student's row in a session.
///
/// `student_name` is copied from the roster when the session opens and is
/// never re-read from `students` afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollCallRecord {
    pub id: i64,
    pub session_id: i64,
    pub student_id: String,
    pub student_name: String,
    pub order_index: i64,
    pub status: RecordStatus,
    pub marked_at: Option<DateTime<Utc>>,
    pub corrected_at: Option<DateTime<Utc>>,
    pub corrected_from_absent: bool,
    pub note: Option<String>,
}

/// Initial `not-called` record created when a session opens.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub session_id: i64,
    pub student_id: String,
    pub student_name: String,
    pub order_index: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordCriteria {
    pub session_id: Option<i64>,
    pub student_id: Option<String>,
    pub status: Option<RecordStatus>,
}
