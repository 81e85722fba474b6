use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use super::types::{NewStudent, Student, StudentCriteria, StudentUpdate};

const SELECT_STUDENT: &str = "\
    SELECT student_id, name, nickname, photo_path, times_called, times_absent, created_at \
    FROM students";

fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
    Ok(Student {
        student_id: row.get("student_id")?,
        name: row.get("name")?,
        nickname: row.get("nickname")?,
        photo_path: row.get("photo_path")?,
        times_called: row.get("times_called")?,
        times_absent: row.get("times_absent")?,
        created_at: row.get("created_at")?,
    })
}

pub fn create(conn: &Connection, new: &NewStudent) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO students \
             (student_id, name, nickname, photo_path, times_called, times_absent, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.student_id,
            new.name,
            new.nickname,
            new.photo_path,
            new.times_called,
            new.times_absent,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn get_by_id(conn: &Connection, student_id: &str) -> rusqlite::Result<Option<Student>> {
    let sql = format!("{SELECT_STUDENT} WHERE student_id = ?1");
    conn.query_row(&sql, params![student_id], row_to_student).optional()
}

/// Full roster, ordered by student ID.
pub fn find_all(conn: &Connection) -> rusqlite::Result<Vec<Student>> {
    find_by(conn, &StudentCriteria::default())
}

pub fn find_by(conn: &Connection, criteria: &StudentCriteria) -> rusqlite::Result<Vec<Student>> {
    let mut filters = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(q) = criteria.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", q.trim());
        filters.push(format!(
            "(name LIKE ?{n} OR COALESCE(nickname, '') LIKE ?{n})",
            n = params_vec.len() + 1
        ));
        params_vec.push(Box::new(pattern));
    }
    if let Some(min) = criteria.min_times_absent {
        filters.push(format!("times_absent >= ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(min));
    }
    if let Some(max) = criteria.max_times_called {
        filters.push(format!("times_called <= ?{}", params_vec.len() + 1));
        params_vec.push(Box::new(max));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };
    let sql = format!("{SELECT_STUDENT}{where_clause} ORDER BY student_id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map(param_refs.as_slice(), row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Update profile fields. Returns false when the student does not exist.
pub fn update(conn: &Connection, student_id: &str, update: &StudentUpdate) -> rusqlite::Result<bool> {
    let affected = conn.execute(
        "UPDATE students SET name = ?1, nickname = ?2, photo_path = ?3 WHERE student_id = ?4",
        params![update.name, update.nickname, update.photo_path, student_id],
    )?;
    Ok(affected > 0)
}

pub fn delete(conn: &Connection, student_id: &str) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM students WHERE student_id = ?1", params![student_id])?;
    Ok(affected > 0)
}

/// Apply counter deltas. Returns false when the student no longer exists.
pub fn add_to_counters(
    conn: &Connection,
    student_id: &str,
    called_delta: i64,
    absent_delta: i64,
) -> rusqlite::Result<bool> {
    let affected = conn.execute(
        "UPDATE students \
         SET times_called = times_called + ?1, times_absent = times_absent + ?2 \
         WHERE student_id = ?3",
        params![called_delta, absent_delta, student_id],
    )?;
    Ok(affected > 0)
}

/// Take back counter contributions, never going below zero. A roster entry
/// re-imported with fresh counters may hold less than the session added.
/// Returns false when the student no longer exists.
pub fn remove_from_counters(
    conn: &Connection,
    student_id: &str,
    called: i64,
    absent: i64,
) -> rusqlite::Result<bool> {
    let affected = conn.execute(
        "UPDATE students \
         SET times_called = MAX(times_called - ?1, 0), times_absent = MAX(times_absent - ?2, 0) \
         WHERE student_id = ?3",
        params![called, absent, student_id],
    )?;
    Ok(affected > 0)
}

pub fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))
}
