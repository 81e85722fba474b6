//! Orchestrates live roll-call sessions.
//!
//! Every public operation runs in exactly one storage transaction and either
//! commits all of its writes (record, counters, audit event) or none of them.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::ManagerConfig;
use crate::db::Storage;
use crate::errors::{Result, RollCallError};
use crate::models::event::{self, EventAction, NewEvent, RollCallEvent};
use crate::models::record::{self, NewRecord, RecordStatus, RollCallRecord};
use crate::models::session::{
    self, CloseReason, NewSession, RollCallSession, SelectionStrategy, SessionMode, SessionSummary,
};
use crate::models::student;

use super::clock::{Clock, SystemClock};
use super::leave_validator::check_approved_leave;
use super::selection;

/// Note attached at open time to records of students with a leave on file.
pub const LEAVE_ON_FILE_NOTE: &str = "leave on file";

/// Parameters for [`RollCallManager::open_session`].
#[derive(Debug, Clone)]
pub struct OpenSessionRequest {
    /// Course or class the session belongs to. One open session per scope.
    pub scope: String,
    /// Defaults to the clock's current date.
    pub session_date: Option<NaiveDate>,
    pub mode: SessionMode,
    pub strategy: SelectionStrategy,
    /// Ignored in full mode. Zero or oversized means the whole roster.
    pub subset_size: usize,
}

/// Session state handed back to the game layer for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session: RollCallSession,
    pub records: Vec<RollCallRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkOutcome {
    pub record: RollCallRecord,
    /// The mark completed the session and it was closed in the same
    /// transaction.
    pub session_closed: bool,
}

pub struct RollCallManager<C: Clock = SystemClock> {
    storage: Storage,
    config: ManagerConfig,
    clock: C,
    rng: Mutex<StdRng>,
}

impl RollCallManager<SystemClock> {
    pub fn new(storage: Storage, config: ManagerConfig) -> Self {
        Self::with_clock(storage, config, SystemClock)
    }
}

impl<C: Clock> RollCallManager<C> {
    pub fn with_clock(storage: Storage, config: ManagerConfig, clock: C) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            storage,
            config,
            clock,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Start a session: select the students and create one `not-called`
    /// record per selected student, all in one transaction.
    pub fn open_session(&self, request: &OpenSessionRequest) -> Result<SessionView> {
        let scope = request.scope.trim();
        if scope.is_empty() {
            return Err(RollCallError::Validation("session scope must not be empty".to_string()));
        }
        let now = self.clock.now();
        let session_date = request.session_date.unwrap_or_else(|| self.clock.today());

        let view = self
            .storage
            .transaction(|tx| {
                if let Some(open) = session::find_open_by_scope(tx, scope)? {
                    return Err(RollCallError::ActiveSessionExists {
                        scope: scope.to_string(),
                        session_id: open.id,
                    });
                }

                let roster = student::find_all(tx)?;
                if roster.is_empty() {
                    return Err(RollCallError::Validation(
                        "no students available for roll call".to_string(),
                    ));
                }

                let selected = {
                    let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                    selection::select(
                        roster,
                        request.mode,
                        request.strategy,
                        request.subset_size,
                        &mut *rng,
                    )
                };

                let session_id = session::create(
                    tx,
                    &NewSession {
                        scope: scope.to_string(),
                        session_date,
                        mode: request.mode,
                        subset_size: i64::try_from(request.subset_size).unwrap_or(i64::MAX),
                        strategy: request.strategy,
                        created_at: now,
                    },
                )?;

                for (index, s) in selected.iter().enumerate() {
                    let on_leave = check_approved_leave(tx, &s.student_id, scope, session_date)?;
                    record::create(
                        tx,
                        &NewRecord {
                            session_id,
                            student_id: s.student_id.clone(),
                            student_name: s.name.clone(),
                            order_index: index as i64 + 1,
                            note: on_leave.then(|| LEAVE_ON_FILE_NOTE.to_string()),
                        },
                    )?;
                }

                event::append(
                    tx,
                    &NewEvent::session(
                        session_id,
                        EventAction::Opened,
                        format!(
                            "{} students, mode {}, strategy {}",
                            selected.len(),
                            request.mode,
                            request.strategy
                        ),
                        now,
                    ),
                )?;

                load_view(tx, session_id)
            })
            .inspect_err(|e| log_failure("open_session", e))?;

        log::info!(
            "Opened roll-call session {} for {} ({} students, {} / {})",
            view.session.id,
            view.session.scope,
            view.records.len(),
            view.session.mode,
            view.session.strategy
        );
        Ok(view)
    }

    /// Give a `not-called` record its first marking.
    ///
    /// `late` goes through the correction path, the only way to reach it. Unlike
    /// [`Self::correct_to_late`], a mark never touches a closed session.
    pub fn mark(&self, session_id: i64, student_id: &str, status: RecordStatus) -> Result<MarkOutcome> {
        if status == RecordStatus::Late {
            let record = self
                .correct(session_id, student_id, true)
                .inspect_err(|e| log_failure("mark", e))?;
            return Ok(MarkOutcome {
                record,
                session_closed: false,
            });
        }
        if !status.is_mark_target() {
            return Err(RollCallError::Validation(format!("cannot mark a student as {status}")));
        }

        let now = self.clock.now();
        let outcome = self
            .storage
            .transaction(|tx| {
                let session = load_open_session(tx, session_id)?;
                let current = load_record(tx, session_id, student_id)?;

                if !current.status.can_transition_to(status) {
                    let hint = if current.status.is_terminal() {
                        "final"
                    } else {
                        "only a late correction is possible"
                    };
                    return Err(RollCallError::Validation(format!(
                        "student {student_id} is already marked {} in session {session_id} ({hint})",
                        current.status
                    )));
                }
                if status == RecordStatus::Leave
                    && !check_approved_leave(tx, student_id, &session.scope, session.session_date)?
                {
                    return Err(RollCallError::LeaveNotApproved {
                        student_id: student_id.to_string(),
                        scope: session.scope.clone(),
                        date: session.session_date,
                    });
                }

                if !record::update_marking(tx, current.id, status, now)? {
                    return Err(RollCallError::Validation(format!(
                        "record of student {student_id} changed while marking"
                    )));
                }
                event::append(
                    tx,
                    &NewEvent::transition(
                        session_id,
                        student_id,
                        EventAction::Marked,
                        current.status,
                        status,
                        now,
                    ),
                )?;

                let mut session_closed = false;
                if self.config.auto_close
                    && record::count_by_status(tx, session_id, RecordStatus::NotCalled)? == 0
                {
                    session_closed = close_in_tx(tx, &session, CloseReason::Completed, now)?;
                }

                let record = reload_record(tx, current.id)?;
                Ok(MarkOutcome {
                    record,
                    session_closed,
                })
            })
            .inspect_err(|e| log_failure("mark", e))?;

        log::debug!("Session {session_id}: {student_id} marked {status}");
        if outcome.session_closed {
            log::info!("Roll-call session {session_id} completed");
        }
        Ok(outcome)
    }

    /// Reclassify an `absent` record as `late` within the correction window.
    ///
    /// Allowed after the session closed as well; the student's absence counter
    /// is then taken back in the same transaction.
    pub fn correct_to_late(&self, session_id: i64, student_id: &str) -> Result<RollCallRecord> {
        self.correct(session_id, student_id, false)
            .inspect_err(|e| log_failure("correct_to_late", e))
    }

    fn correct(&self, session_id: i64, student_id: &str, require_open: bool) -> Result<RollCallRecord> {
        let now = self.clock.now();
        let window = self.config.correction_window;

        let corrected = self
            .storage
            .transaction(|tx| {
                let session = if require_open {
                    load_open_session(tx, session_id)?
                } else {
                    session::get_by_id(tx, session_id)?
                        .ok_or(RollCallError::SessionNotFound(session_id))?
                };
                let current = load_record(tx, session_id, student_id)?;

                if current.status != RecordStatus::Absent {
                    return Err(RollCallError::Validation(format!(
                        "only absent records can be corrected to late, student {student_id} is {}",
                        current.status
                    )));
                }
                let marked_at = current.marked_at.ok_or_else(|| {
                    RollCallError::Validation(format!(
                        "absent record of student {student_id} has no marking time"
                    ))
                })?;
                let elapsed = now - marked_at;
                if !within_window(elapsed, window) {
                    return Err(RollCallError::CorrectionWindowExpired {
                        student_id: student_id.to_string(),
                        elapsed_secs: elapsed.num_seconds(),
                        window_secs: window.num_seconds(),
                    });
                }

                if !record::update_correction(tx, current.id, now)? {
                    return Err(RollCallError::Validation(format!(
                        "record of student {student_id} changed while correcting"
                    )));
                }
                if !session.is_open() && !student::remove_from_counters(tx, student_id, 0, 1)? {
                    log::warn!("Student {student_id} left the roster, counters not adjusted");
                }
                event::append(
                    tx,
                    &NewEvent::transition(
                        session_id,
                        student_id,
                        EventAction::Corrected,
                        RecordStatus::Absent,
                        RecordStatus::Late,
                        now,
                    ),
                )?;

                reload_record(tx, current.id)
            })?;

        log::info!("Session {session_id}: {student_id} corrected from absent to late");
        Ok(corrected)
    }

    /// Force-close a session. Closing an already closed session changes
    /// nothing and returns `false`.
    pub fn close_session(&self, session_id: i64) -> Result<bool> {
        let now = self.clock.now();
        let closed = self
            .storage
            .transaction(|tx| {
                let session = session::get_by_id(tx, session_id)?
                    .ok_or(RollCallError::SessionNotFound(session_id))?;
                close_in_tx(tx, &session, CloseReason::Forced, now)
            })
            .inspect_err(|e| log_failure("close_session", e))?;

        if closed {
            log::info!("Roll-call session {session_id} closed by operator");
        } else {
            log::debug!("Roll-call session {session_id} was already closed");
        }
        Ok(closed)
    }

    /// Remove a session with its records and audit trail. Counter
    /// contributions of a closed session are reversed.
    pub fn delete_session(&self, session_id: i64) -> Result<()> {
        self.storage
            .transaction(|tx| {
                let session = session::get_by_id(tx, session_id)?
                    .ok_or(RollCallError::SessionNotFound(session_id))?;
                if !session.is_open() {
                    for r in record::find_by_session(tx, session_id)? {
                        if !r.status.is_marked() {
                            continue;
                        }
                        let (called, absent) = r.status.counter_deltas();
                        if !student::remove_from_counters(tx, &r.student_id, called, absent)? {
                            log::warn!(
                                "Student {} left the roster, counters for session {session_id} not reversed",
                                r.student_id
                            );
                        }
                    }
                }
                session::delete(tx, session_id)?;
                Ok(())
            })
            .inspect_err(|e| log_failure("delete_session", e))?;

        log::warn!("Deleted roll-call session {session_id}");
        Ok(())
    }

    pub fn session_view(&self, session_id: i64) -> Result<SessionView> {
        self.storage.read(|conn| load_view(conn, session_id))
    }

    /// Next student to call, in call order. `None` once everyone is marked.
    pub fn next_student(&self, session_id: i64) -> Result<Option<RollCallRecord>> {
        self.storage.read(|conn| {
            let session = session::get_by_id(conn, session_id)?
                .ok_or(RollCallError::SessionNotFound(session_id))?;
            if !session.is_open() {
                return Ok(None);
            }
            Ok(record::next_not_called(conn, session_id)?)
        })
    }

    pub fn active_session(&self, scope: &str) -> Result<Option<RollCallSession>> {
        self.storage
            .read(|conn| Ok(session::find_open_by_scope(conn, scope.trim())?))
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.storage.read(|conn| Ok(session::list_summaries(conn)?))
    }

    pub fn session_history(&self, session_id: i64) -> Result<Vec<RollCallEvent>> {
        self.storage
            .read(|conn| Ok(event::find_by_session(conn, session_id)?))
    }
}

/// A zero window disables corrections entirely.
fn within_window(elapsed: Duration, window: Duration) -> bool {
    window > Duration::zero() && elapsed <= window
}

fn load_view(conn: &Connection, session_id: i64) -> Result<SessionView> {
    let session = session::get_by_id(conn, session_id)?
        .ok_or(RollCallError::SessionNotFound(session_id))?;
    let records = record::find_by_session(conn, session_id)?;
    Ok(SessionView { session, records })
}

fn load_open_session(conn: &Connection, session_id: i64) -> Result<RollCallSession> {
    let session = session::get_by_id(conn, session_id)?
        .ok_or(RollCallError::SessionNotFound(session_id))?;
    if !session.is_open() {
        return Err(RollCallError::SessionAlreadyClosed(session_id));
    }
    Ok(session)
}

fn load_record(conn: &Connection, session_id: i64, student_id: &str) -> Result<RollCallRecord> {
    record::find_by_session_and_student(conn, session_id, student_id)?.ok_or_else(|| {
        RollCallError::RecordNotFound {
            session_id,
            student_id: student_id.to_string(),
        }
    })
}

fn reload_record(conn: &Connection, record_id: i64) -> Result<RollCallRecord> {
    Ok(record::get_by_id(conn, record_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?)
}

/// Close `session` and apply its counter contributions. Returns false, and
/// writes nothing, when it was already closed.
fn close_in_tx(
    conn: &Connection,
    session: &RollCallSession,
    reason: CloseReason,
    now: DateTime<Utc>,
) -> Result<bool> {
    if !session::close(conn, session.id, now, reason)? {
        return Ok(false);
    }

    let records = record::find_by_session(conn, session.id)?;
    let mut marked = 0usize;
    for r in &records {
        if !r.status.is_marked() {
            continue;
        }
        marked += 1;
        let (called, absent) = r.status.counter_deltas();
        if !student::add_to_counters(conn, &r.student_id, called, absent)? {
            log::warn!(
                "Student {} left the roster, counters for session {} skipped",
                r.student_id,
                session.id
            );
        }
    }

    event::append(
        conn,
        &NewEvent::session(
            session.id,
            EventAction::Closed,
            format!("{reason}: {marked} of {} students marked", records.len()),
            now,
        ),
    )?;
    Ok(true)
}

fn log_failure(operation: &str, error: &RollCallError) {
    if error.is_storage() {
        log::error!("{operation} failed: {error}");
    } else {
        log::warn!("{operation} rejected: {error}");
    }
}
