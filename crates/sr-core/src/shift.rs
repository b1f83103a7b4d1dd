//! Shift creation requests.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A request to schedule one employee from `start` to `end`.
///
/// `team_id` is the team snapshot historized on the master shift at creation
/// time; it is never re-resolved against live membership afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftDraft {
    pub employee_id: i64,
    pub team_id: Option<i64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub activity_id: Option<String>,
    pub note: Option<String>,
}
