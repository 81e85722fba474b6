use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use super::types::{LeaveCriteria, NewLeave, StudentLeave};

const SELECT_LEAVE: &str = "\
    SELECT id, student_id, scope, start_date, end_date, approved, reason \
    FROM student_leaves";

fn row_to_leave(row: &rusqlite::Row) -> rusqlite::Result<StudentLeave> {
    Ok(StudentLeave {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        scope: row.get("scope")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        approved: row.get("approved")?,
        reason: row.get("reason")?,
    })
}

pub fn create(conn: &Connection, new: &NewLeave) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO student_leaves (student_id, scope, start_date, end_date, approved, reason) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.student_id,
            new.scope,
            new.start_date,
            new.end_date,
            new.approved,
            new.reason,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<StudentLeave>> {
    let sql = format!("{SELECT_LEAVE} WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_leave).optional()
}

pub fn find_by(conn: &Connection, criteria: &LeaveCriteria) -> rusqlite::Result<Vec<StudentLeave>> {
    let mut filters = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(student_id) = &criteria.student_id {
        filters.push(format!("student_id = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(student_id.clone()));
    }
    if let Some(scope) = &criteria.scope {
        filters.push(format!("scope = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(scope.clone()));
    }
    if let Some(approved) = criteria.approved {
        filters.push(format!("approved = ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(approved));
    }
    if let Some(date) = criteria.covering {
        filters.push(format!(
            "start_date <= ?{n} AND end_date >= ?{n}",
            n = params_vec.len() + 1
        ));
        params_vec.push(Box::new(date));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };
    let sql = format!("{SELECT_LEAVE}{where_clause} ORDER BY start_date, id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let leaves = stmt
        .query_map(param_refs.as_slice(), row_to_leave)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(leaves)
}

pub fn update(conn: &Connection, id: i64, leave: &NewLeave) -> rusqlite::Result<bool> {
    let affected = conn.execute(
        "UPDATE student_leaves \
         SET student_id = ?1, scope = ?2, start_date = ?3, end_date = ?4, approved = ?5, reason = ?6 \
         WHERE id = ?7",
        params![
            leave.student_id,
            leave.scope,
            leave.start_date,
            leave.end_date,
            leave.approved,
            leave.reason,
            id,
        ],
    )?;
    Ok(affected > 0)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM student_leaves WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// First approved leave of `student_id` in `scope` whose range contains `date`.
pub fn find_approved_covering(
    conn: &Connection,
    student_id: &str,
    scope: &str,
    date: NaiveDate,
) -> rusqlite::Result<Option<StudentLeave>> {
    let sql = format!(
        "{SELECT_LEAVE} \
         WHERE student_id = ?1 AND scope = ?2 AND approved = 1 \
           AND start_date <= ?3 AND end_date >= ?3 \
         ORDER BY id LIMIT 1"
    );
    conn.query_row(&sql, params![student_id, scope, date], row_to_leave)
        .optional()
}
