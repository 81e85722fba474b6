//! Shared test infrastructure for roll-call tests.
//!
//! # Test Database Setup
//! - `setup_test_db()` - migrated, empty database in a temp dir
//! - `setup_manager()` - database + manager on a manual clock
//! - `seed_roster()` - the five-student roster used by most scenarios

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use rollcall::config::ManagerConfig;
use rollcall::db::Storage;
use rollcall::models::leave::{self, NewLeave};
use rollcall::models::student::{self, NewStudent};
use rollcall::roll_call::{ManualClock, RollCallManager};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const SCOPE: &str = "math-101";

pub fn class_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 20, 8, 0, 0).unwrap()
}

pub fn class_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 20).unwrap()
}

// ============================================================================
// DATABASE SETUP
// ============================================================================

/// Setup a migrated test database.
///
/// Returns a tuple of (TempDir, Storage) where TempDir must be kept alive
/// for the database file to remain valid.
pub fn setup_test_db() -> (TempDir, Storage) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let storage = Storage::open(db_path.to_str().expect("utf-8 temp path"), 4)
        .expect("Failed to open test DB");
    storage
        .apply_all_migrations()
        .expect("Failed to run migrations");
    (dir, storage)
}

pub struct TestContext {
    pub dir: TempDir,
    pub storage: Storage,
    pub clock: Arc<ManualClock>,
    pub manager: RollCallManager<Arc<ManualClock>>,
}

/// Database, manual clock at `class_start()`, and a manager with a fixed rng
/// seed and the default 10 minute correction window.
pub fn setup_manager() -> TestContext {
    setup_manager_with(ManagerConfig {
        rng_seed: Some(42),
        ..ManagerConfig::default()
    })
}

pub fn setup_manager_with(config: ManagerConfig) -> TestContext {
    setup_manager_with_clock(config, ManualClock::new(class_start()))
}

pub fn setup_manager_with_clock(config: ManagerConfig, clock: ManualClock) -> TestContext {
    let (dir, storage) = setup_test_db();
    let clock = Arc::new(clock);
    let manager = RollCallManager::with_clock(storage.clone(), config, Arc::clone(&clock));
    TestContext {
        dir,
        storage,
        clock,
        manager,
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn add_student(storage: &Storage, id: &str, name: &str, called: i64, absent: i64) {
    storage
        .transaction(|tx| {
            student::create(
                tx,
                &NewStudent {
                    student_id: id.to_string(),
                    name: name.to_string(),
                    times_called: called,
                    times_absent: absent,
                    ..Default::default()
                },
            )?;
            Ok(())
        })
        .expect("Failed to create student");
}

/// Students A..E with prior absence counts {A:2, B:0, C:1, D:2, E:0}.
pub fn seed_roster(storage: &Storage) {
    add_student(storage, "A", "Alice", 5, 2);
    add_student(storage, "B", "Bob", 4, 0);
    add_student(storage, "C", "Chen", 3, 1);
    add_student(storage, "D", "Dana", 6, 2);
    add_student(storage, "E", "Eli", 2, 0);
}

pub fn add_leave(storage: &Storage, student_id: &str, scope: &str, approved: bool) -> i64 {
    storage
        .transaction(|tx| {
            Ok(leave::create(
                tx,
                &NewLeave {
                    student_id: student_id.to_string(),
                    scope: scope.to_string(),
                    start_date: class_date(),
                    end_date: class_date(),
                    approved,
                    reason: Some("test".to_string()),
                },
            )?)
        })
        .expect("Failed to create leave")
}

pub fn get_student(storage: &Storage, id: &str) -> student::Student {
    storage
        .read(|conn| Ok(student::get_by_id(conn, id)?))
        .expect("Query failed")
        .expect("Student not found")
}
