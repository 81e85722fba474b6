use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::record::RecordStatus;
use crate::models::text_enum;

text_enum! {
    pub enum EventAction {
        Opened => "opened",
        Marked => "marked",
        Corrected => "corrected",
        Closed => "closed",
    }
}

/// Audit row appended for every committed roll-call transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollCallEvent {
    pub id: i64,
    pub session_id: i64,
    pub student_id: Option<String>,
    pub action: EventAction,
    pub from_status: Option<RecordStatus>,
    pub to_status: Option<RecordStatus>,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub session_id: i64,
    pub student_id: Option<String>,
    pub action: EventAction,
    pub from_status: Option<RecordStatus>,
    pub to_status: Option<RecordStatus>,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewEvent {
    /// Session-level event (opened, closed).
    pub fn session(session_id: i64, action: EventAction, detail: String, at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            student_id: None,
            action,
            from_status: None,
            to_status: None,
            detail: Some(detail),
            occurred_at: at,
        }
    }

    /// Status change of one student's record.
    pub fn transition(
        session_id: i64,
        student_id: &str,
        action: EventAction,
        from: RecordStatus,
        to: RecordStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            student_id: Some(student_id.to_string()),
            action,
            from_status: Some(from),
            to_status: Some(to),
            detail: None,
            occurred_at: at,
        }
    }
}
