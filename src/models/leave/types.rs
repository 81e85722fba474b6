use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A leave request covering `start_date..=end_date` for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLeave {
    pub id: i64,
    pub student_id: String,
    pub scope: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub approved: bool,
    pub reason: Option<String>,
}

/// Written by the leave-submission flow.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLeave {
    pub student_id: String,
    pub scope: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub approved: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveCriteria {
    pub student_id: Option<String>,
    pub scope: Option<String>,
    pub approved: Option<bool>,
    pub covering: Option<NaiveDate>,
}
