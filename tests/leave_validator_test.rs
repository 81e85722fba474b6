mod common;

use chrono::Duration;
use tempfile::TempDir;

use rollcall::db::Storage;
use rollcall::roll_call::{check_approved_leave, is_on_approved_leave};
use common::*;

#[test]
fn test_approved_leave_in_scope_counts() {
    let (_dir, storage) = setup_test_db();
    seed_roster(&storage);
    add_leave(&storage, "B", SCOPE, true);

    let on_leave = storage
        .read(|conn| check_approved_leave(conn, "B", SCOPE, class_date()))
        .unwrap();
    assert!(on_leave);
}

#[test]
fn test_pending_leave_does_not_count() {
    let (_dir, storage) = setup_test_db();
    seed_roster(&storage);
    add_leave(&storage, "B", SCOPE, false);

    storage
        .read(|conn| {
            assert!(!check_approved_leave(conn, "B", SCOPE, class_date())?);
            assert!(!is_on_approved_leave(conn, "B", SCOPE, class_date()));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_leave_for_other_scope_or_date_does_not_count() {
    let (_dir, storage) = setup_test_db();
    seed_roster(&storage);
    add_leave(&storage, "B", "art-200", true);

    storage
        .read(|conn| {
            assert!(!check_approved_leave(conn, "B", SCOPE, class_date())?);
            assert!(check_approved_leave(conn, "B", "art-200", class_date())?);
            assert!(!check_approved_leave(
                conn,
                "B",
                "art-200",
                class_date() + Duration::days(1)
            )?);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_student_without_any_leave_is_not_on_leave() {
    let (_dir, storage) = setup_test_db();
    seed_roster(&storage);

    let on_leave = storage
        .read(|conn| Ok(is_on_approved_leave(conn, "E", SCOPE, class_date())))
        .unwrap();
    assert!(!on_leave);
}

#[test]
fn test_lookup_failure_is_treated_as_not_on_leave() {
    // No migrations applied, so the leave table does not exist.
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("bare.db");
    let storage = Storage::open(path.to_str().unwrap(), 1).expect("Failed to open DB");

    storage
        .read(|conn| {
            assert!(check_approved_leave(conn, "B", SCOPE, class_date()).is_err());
            assert!(!is_on_approved_leave(conn, "B", SCOPE, class_date()));
            Ok(())
        })
        .unwrap();
}
