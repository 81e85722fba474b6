//! Per-record state machine.
//!
//! ```text
//! not-called --> present | leave | absent
//! absent     --> late            (correction path, time-boxed)
//! ```
//!
//! Every other transition is rejected. `absent` is the only marked state that
//! can still change.

pub use crate::models::record::RecordStatus;

impl RecordStatus {
    /// Statuses an operator may assign through a regular mark.
    pub fn is_mark_target(self) -> bool {
        matches!(self, RecordStatus::Present | RecordStatus::Leave | RecordStatus::Absent)
    }

    /// A record that received any marking.
    pub fn is_marked(self) -> bool {
        self != RecordStatus::NotCalled
    }

    /// Marked and no longer changeable.
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Present | RecordStatus::Leave | RecordStatus::Late)
    }

    pub fn can_transition_to(self, next: RecordStatus) -> bool {
        match self {
            RecordStatus::NotCalled => next.is_mark_target(),
            RecordStatus::Absent => next == RecordStatus::Late,
            RecordStatus::Present | RecordStatus::Leave | RecordStatus::Late => false,
        }
    }

    /// `(times_called, times_absent)` contribution of a record when its
    /// session closes.
    pub fn counter_deltas(self) -> (i64, i64) {
        match self {
            RecordStatus::NotCalled => (0, 0),
            RecordStatus::Present | RecordStatus::Leave | RecordStatus::Late => (1, 0),
            RecordStatus::Absent => (1, 1),
        }
    }
}
