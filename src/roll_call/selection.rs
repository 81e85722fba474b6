use rand::Rng;
use rand::seq::SliceRandom;

use crate::models::session::{SelectionStrategy, SessionMode};
use crate::models::student::Student;

/// Number of students a session calls. Subset sizes of zero or larger than
/// the roster mean the whole roster.
pub fn effective_count(mode: SessionMode, subset_size: usize, roster_len: usize) -> usize {
    match mode {
        SessionMode::Full => roster_len,
        SessionMode::RandomSubset if subset_size == 0 => roster_len,
        SessionMode::RandomSubset => subset_size.min(roster_len),
    }
}

/// Pick and order the students for a session.
///
/// Returned order is the call order. Priority strategies break ties by
/// ascending student ID; the random strategy draws uniformly without
/// replacement.
pub fn select<R: Rng + ?Sized>(
    mut roster: Vec<Student>,
    mode: SessionMode,
    strategy: SelectionStrategy,
    subset_size: usize,
    rng: &mut R,
) -> Vec<Student> {
    let count = effective_count(mode, subset_size, roster.len());

    // Stable base order so a seeded rng reproduces the same draw.
    roster.sort_by(|a, b| a.student_id.cmp(&b.student_id));

    match strategy {
        SelectionStrategy::Random => {
            let (picked, _) = roster.partial_shuffle(rng, count);
            picked.to_vec()
        }
        SelectionStrategy::MostAbsencesFirst => {
            roster.sort_by(|a, b| {
                b.times_absent
                    .cmp(&a.times_absent)
                    .then_with(|| a.student_id.cmp(&b.student_id))
            });
            roster.truncate(count);
            roster
        }
        SelectionStrategy::LeastCalledFirst => {
            roster.sort_by(|a, b| {
                a.times_called
                    .cmp(&b.times_called)
                    .then_with(|| a.student_id.cmp(&b.student_id))
            });
            roster.truncate(count);
            roster
        }
    }
}
