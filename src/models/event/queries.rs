use rusqlite::{Connection, params};

use super::types::{NewEvent, RollCallEvent};

pub fn append(conn: &Connection, event: &NewEvent) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO roll_call_events \
             (session_id, student_id, action, from_status, to_status, detail, occurred_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.session_id,
            event.student_id,
            event.action,
            event.from_status,
            event.to_status,
            event.detail,
            event.occurred_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Audit trail of a session, oldest first.
pub fn find_by_session(conn: &Connection, session_id: i64) -> rusqlite::Result<Vec<RollCallEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, student_id, action, from_status, to_status, detail, occurred_at \
         FROM roll_call_events WHERE session_id = ?1 ORDER BY id",
    )?;
    let events = stmt
        .query_map(params![session_id], |row| {
            Ok(RollCallEvent {
                id: row.get("id")?,
                session_id: row.get("session_id")?,
                student_id: row.get("student_id")?,
                action: row.get("action")?,
                from_status: row.get("from_status")?,
                to_status: row.get("to_status")?,
                detail: row.get("detail")?,
                occurred_at: row.get("occurred_at")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}
