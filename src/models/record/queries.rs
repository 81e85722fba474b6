use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::types::{NewRecord, RecordCriteria, RecordStatus, RollCallRecord};

const SELECT_RECORD: &str = "\
    SELECT id, session_id, student_id, student_name, order_index, status, \
           marked_at, corrected_at, corrected_from_absent, note \
    FROM roll_call_records";

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RollCallRecord> {
    Ok(RollCallRecord {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        student_id: row.get("student_id")?,
        student_name: row.get("student_name")?,
        order_index: row.get("order_index")?,
        status: row.get("status")?,
        marked_at: row.get("marked_at")?,
        corrected_at: row.get("corrected_at")?,
        corrected_from_absent: row.get("corrected_from_absent")?,
        note: row.get("note")?,
    })
}

pub fn create(conn: &Connection, new: &NewRecord) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO roll_call_records \
             (session_id, student_id, student_name, order_index, status, note) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.session_id,
            new.student_id,
            new.student_name,
            new.order_index,
            RecordStatus::NotCalled,
            new.note,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<RollCallRecord>> {
    let sql = format!("{SELECT_RECORD} WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_record).optional()
}

pub fn find_by(conn: &Connection, criteria: &RecordCriteria) -> rusqlite::Result<Vec<RollCallRecord>> {
    let mut filters = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(session_id) = criteria.session_id {
        filters.push(format!("session_id = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(session_id));
    }
    if let Some(student_id) = &criteria.student_id {
        filters.push(format!("student_id = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(student_id.clone()));
    }
    if let Some(status) = criteria.status {
        filters.push(format!("status = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(status));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };
    let sql = format!("{SELECT_RECORD}{where_clause} ORDER BY session_id, order_index");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(param_refs.as_slice(), row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// All records of a session in call order.
pub fn find_by_session(conn: &Connection, session_id: i64) -> rusqlite::Result<Vec<RollCallRecord>> {
    find_by(
        conn,
        &RecordCriteria {
            session_id: Some(session_id),
            ..Default::default()
        },
    )
}

pub fn find_by_session_and_student(
    conn: &Connection,
    session_id: i64,
    student_id: &str,
) -> rusqlite::Result<Option<RollCallRecord>> {
    let sql = format!("{SELECT_RECORD} WHERE session_id = ?1 AND student_id = ?2");
    conn.query_row(&sql, params![session_id, student_id], row_to_record)
        .optional()
}

/// Lowest-ordered record of the session that is still `not-called`.
pub fn next_not_called(conn: &Connection, session_id: i64) -> rusqlite::Result<Option<RollCallRecord>> {
    let sql = format!(
        "{SELECT_RECORD} WHERE session_id = ?1 AND status = 'not-called' \
         ORDER BY order_index LIMIT 1"
    );
    conn.query_row(&sql, params![session_id], row_to_record).optional()
}

pub fn count_by_status(conn: &Connection, session_id: i64, status: RecordStatus) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM roll_call_records WHERE session_id = ?1 AND status = ?2",
        params![session_id, status],
        |row| row.get(0),
    )
}

/// Number of `absent` records held by a student across all sessions.
pub fn count_absences_by_student(conn: &Connection, student_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM roll_call_records WHERE student_id = ?1 AND status = 'absent'",
        params![student_id],
        |row| row.get(0),
    )
}

/// Record the first marking. Only touches a row that is still `not-called`;
/// returns false otherwise.
pub fn update_marking(
    conn: &Connection,
    id: i64,
    status: RecordStatus,
    marked_at: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let affected = conn.execute(
        "UPDATE roll_call_records SET status = ?1, marked_at = ?2 \
         WHERE id = ?3 AND status = 'not-called'",
        params![status, marked_at, id],
    )?;
    Ok(affected > 0)
}

/// Rewrite an `absent` record as `late`. Returns false if it was not absent.
pub fn update_correction(conn: &Connection, id: i64, corrected_at: DateTime<Utc>) -> rusqlite::Result<bool> {
    let affected = conn.execute(
        "UPDATE roll_call_records \
         SET status = 'late', corrected_at = ?1, corrected_from_absent = 1 \
         WHERE id = ?2 AND status = 'absent'",
        params![corrected_at, id],
    )?;
    Ok(affected > 0)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM roll_call_records WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}
