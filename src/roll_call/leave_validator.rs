//! Answers whether a student holds an approved leave for a session.
//!
//! Absence of leave data always means "not on leave"; a student is never let
//! off roll call because a lookup came back empty or failed.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::errors::Result;
use crate::models::leave;

/// Strict variant: storage failures propagate to the caller.
pub fn check_approved_leave(
    conn: &Connection,
    student_id: &str,
    scope: &str,
    session_date: NaiveDate,
) -> Result<bool> {
    let found = leave::find_approved_covering(conn, student_id, scope, session_date)?;
    Ok(found.is_some())
}

/// Never fails. A lookup error is logged and answered with `false`.
pub fn is_on_approved_leave(
    conn: &Connection,
    student_id: &str,
    scope: &str,
    session_date: NaiveDate,
) -> bool {
    match check_approved_leave(conn, student_id, scope, session_date) {
        Ok(on_leave) => on_leave,
        Err(e) => {
            log::error!("Leave lookup for {student_id} in {scope} failed, treating as not on leave: {e}");
            false
        }
    }
}
