use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A roster entry with its cumulative attendance counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub nickname: Option<String>,
    pub photo_path: Option<String>,
    pub times_called: i64,
    pub times_absent: i64,
    pub created_at: DateTime<Utc>,
}

/// Roster import payload. Counters carry history from a previous system and
/// default to zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub photo_path: Option<String>,
    #[serde(default)]
    pub times_called: i64,
    #[serde(default)]
    pub times_absent: i64,
}

/// Editable profile fields. Counters are not part of it.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentUpdate {
    pub name: String,
    pub nickname: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentCriteria {
    /// Substring match on name or nickname. SQLite `LIKE` folds ASCII case
    /// only; other scripts match exactly.
    pub search: Option<String>,
    pub min_times_absent: Option<i64>,
    pub max_times_called: Option<i64>,
}
