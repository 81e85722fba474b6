use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction, TransactionBehavior, params};

use crate::errors::{Result, RollCallError};
use crate::models::{leave, student};

pub type DbPool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One schema step. Versions are applied in ascending order, each at most once.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: include_str!("migrations/v1_initial_schema.sql"),
    },
    Migration {
        version: 2,
        name: "audit_events",
        sql: include_str!("migrations/v2_audit_events.sql"),
    },
];

pub fn latest_version() -> u32 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

pub fn init_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_url).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(())
    });
    let pool = Pool::builder().max_size(max_size).build(manager)?;
    Ok(pool)
}

/// Explicitly passed handle to the roll-call database.
///
/// Every write goes through [`Storage::transaction`], which commits when the
/// closure returns `Ok` and rolls back on `Err`. A panic inside the closure
/// drops the transaction, which rolls it back as well.
#[derive(Clone)]
pub struct Storage {
    pool: DbPool,
}

impl Storage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (creating the parent directory if needed) a file-backed database.
    pub fn open(path: &str, pool_size: u32) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let pool = init_pool(path, pool_size)?;
        log::info!("Opened roll-call database at {path}");
        Ok(Self::new(pool))
    }

    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::error!("Rollback failed after '{e}': {rollback_err}");
                }
                Err(e)
            }
        }
    }

    /// Run read-only work on a pooled connection.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Execute one statement in autocommit mode. Returns rows affected.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        let conn = self.pool.get()?;
        Ok(conn.execute(sql, params)?)
    }

    pub fn query<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn apply_migrations(&self, target_version: u32) -> Result<u32> {
        let mut conn = self.pool.get()?;
        apply_migrations(&mut conn, target_version)
    }

    pub fn apply_all_migrations(&self) -> Result<u32> {
        self.apply_migrations(latest_version())
    }

    pub fn current_version(&self) -> Result<u32> {
        let conn = self.pool.get()?;
        current_version(&conn)
    }
}

/// Last applied schema version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let has_table: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(0);
    }
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Bring the schema up to `target_version`.
///
/// All pending steps run in a single transaction, so a failing step leaves the
/// schema exactly as it was before the call. Returns the resulting version.
pub fn apply_migrations(conn: &mut Connection, target_version: u32) -> Result<u32> {
    if target_version > latest_version() {
        return Err(RollCallError::Validation(format!(
            "unknown schema version {target_version}, latest is {}",
            latest_version()
        )));
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (\
             version    INTEGER PRIMARY KEY, \
             name       TEXT NOT NULL, \
             applied_at TEXT NOT NULL)",
    )?;

    let current = current_version(conn)?;
    let mut pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|m| m.version > current && m.version <= target_version)
        .collect();
    if pending.is_empty() {
        log::debug!("Schema already at version {current}");
        return Ok(current);
    }
    pending.sort_by_key(|m| m.version);

    let tx = conn.transaction()?;
    let mut applied = current;
    for migration in pending {
        let version = migration.version;
        tx.execute_batch(migration.sql)
            .map_err(|source| RollCallError::Migration { version, source })?;
        tx.execute(
            "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![version, migration.name, Utc::now()],
        )
        .map_err(|source| RollCallError::Migration { version, source })?;
        log::info!("Applied migration v{version} ({})", migration.name);
        applied = version;
    }
    tx.commit()?;

    Ok(applied)
}

/// Insert a demo roster and a few approved leaves, only into an empty roster.
/// Returns the number of students created.
pub fn seed_demo_roster(conn: &Connection, scope: &str, today: NaiveDate) -> Result<usize> {
    let existing = student::count(conn)?;
    if existing > 0 {
        log::info!("Roster already has {existing} students, skipping demo seed");
        return Ok(0);
    }

    let roster: [(&str, &str, Option<&str>, i64, i64); 10] = [
        ("2023001", "Tang Xiaoyu", Some("Yubao"), 15, 3),
        ("2023002", "Tang Xiaoyong", None, 12, 0),
        ("2023003", "Tang Xiaoya", Some("Yaya"), 20, 1),
        ("2023004", "Tang Xiaoxin", Some("Xiaoxin"), 5, 5),
        ("2023005", "Tang Xiaomin", None, 18, 2),
        ("2023006", "Tang Xiaobo", Some("Bobo"), 8, 4),
        ("2023007", "Tang Xiaoyue", Some("Xiaoyue"), 22, 0),
        ("2023008", "Tang Xiaojie", None, 4, 6),
        ("2023009", "Tang Xiaoqing", Some("Qingqing"), 30, 1),
        ("2023010", "Tang Xiaofeng", Some("Fengfeng"), 9, 0),
    ];
    for (id, name, nickname, called, absent) in roster {
        student::create(
            conn,
            &student::NewStudent {
                student_id: id.to_string(),
                name: name.to_string(),
                nickname: nickname.map(str::to_string),
                photo_path: Some(format!("assets/images/students/student{}.png", &id[5..])),
                times_called: called,
                times_absent: absent,
            },
        )?;
    }

    let leaves = [
        ("2023003", "Sports meeting"),
        ("2023005", "Sick leave"),
        ("2023009", "Internship interview"),
    ];
    for (student_id, reason) in leaves {
        leave::create(
            conn,
            &leave::NewLeave {
                student_id: student_id.to_string(),
                scope: scope.to_string(),
                start_date: today,
                end_date: today,
                approved: true,
                reason: Some(reason.to_string()),
            },
        )?;
    }

    log::info!("Seeded demo roster: {} students, {} leaves", roster.len(), leaves.len());
    Ok(roster.len())
}
