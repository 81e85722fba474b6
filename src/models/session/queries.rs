use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::types::{CloseReason, NewSession, RollCallSession, SessionCriteria, SessionStatus, SessionSummary};

const SELECT_SESSION: &str = "\
    SELECT id, scope, session_date, mode, subset_size, strategy, status, \
           created_at, closed_at, close_reason \
    FROM roll_call_sessions";

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<RollCallSession> {
    Ok(RollCallSession {
        id: row.get("id")?,
        scope: row.get("scope")?,
        session_date: row.get("session_date")?,
        mode: row.get("mode")?,
        subset_size: row.get("subset_size")?,
        strategy: row.get("strategy")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        closed_at: row.get("closed_at")?,
        close_reason: row.get("close_reason")?,
    })
}

pub fn create(conn: &Connection, new: &NewSession) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO roll_call_sessions \
             (scope, session_date, mode, subset_size, strategy, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.scope,
            new.session_date,
            new.mode,
            new.subset_size,
            new.strategy,
            SessionStatus::Open,
            new.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<RollCallSession>> {
    let sql = format!("{SELECT_SESSION} WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_session).optional()
}

/// Sessions matching the criteria, newest first.
pub fn find_by(conn: &Connection, criteria: &SessionCriteria) -> rusqlite::Result<Vec<RollCallSession>> {
    let mut filters = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(scope) = &criteria.scope {
        filters.push(format!("scope = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(scope.clone()));
    }
    if let Some(status) = criteria.status {
        filters.push(format!("status = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(status));
    }
    if let Some(from) = criteria.from_date {
        filters.push(format!("session_date >= ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(from));
    }
    if let Some(to) = criteria.to_date {
        filters.push(format!("session_date <= ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(to));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };
    let sql = format!("{SELECT_SESSION}{where_clause} ORDER BY id DESC");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let sessions = stmt
        .query_map(param_refs.as_slice(), row_to_session)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sessions)
}

pub fn find_open_by_scope(conn: &Connection, scope: &str) -> rusqlite::Result<Option<RollCallSession>> {
    let sql = format!("{SELECT_SESSION} WHERE scope = ?1 AND status = 'open' ORDER BY id DESC LIMIT 1");
    conn.query_row(&sql, params![scope], row_to_session).optional()
}

/// Move an open session to closed. Returns false if it was not open.
pub fn close(
    conn: &Connection,
    id: i64,
    closed_at: DateTime<Utc>,
    reason: CloseReason,
) -> rusqlite::Result<bool> {
    let affected = conn.execute(
        "UPDATE roll_call_sessions \
         SET status = 'closed', closed_at = ?1, close_reason = ?2 \
         WHERE id = ?3 AND status = 'open'",
        params![closed_at, reason, id],
    )?;
    Ok(affected > 0)
}

/// Delete a session; its records and events cascade.
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM roll_call_sessions WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// Overview of all sessions with per-status record counts, newest first.
pub fn list_summaries(conn: &Connection) -> rusqlite::Result<Vec<SessionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.scope, s.session_date, s.mode, s.strategy, s.status, s.created_at, \
                COUNT(r.id) AS record_count, \
                COALESCE(SUM(r.status = 'not-called'), 0) AS not_called, \
                COALESCE(SUM(r.status = 'present'), 0) AS present, \
                COALESCE(SUM(r.status = 'leave'), 0) AS leave, \
                COALESCE(SUM(r.status = 'absent'), 0) AS absent, \
                COALESCE(SUM(r.status = 'late'), 0) AS late \
         FROM roll_call_sessions s \
         LEFT JOIN roll_call_records r ON r.session_id = s.id \
         GROUP BY s.id \
         ORDER BY s.id DESC",
    )?;
    let summaries = stmt
        .query_map([], |row| {
            Ok(SessionSummary {
                id: row.get("id")?,
                scope: row.get("scope")?,
                session_date: row.get("session_date")?,
                mode: row.get("mode")?,
                strategy: row.get("strategy")?,
                status: row.get("status")?,
                created_at: row.get("created_at")?,
                record_count: row.get("record_count")?,
                not_called: row.get("not_called")?,
                present: row.get("present")?,
                leave: row.get("leave")?,
                absent: row.get("absent")?,
                late: row.get("late")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}
