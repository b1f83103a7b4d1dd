//! Team-transfer transition drafts.
//!
//! Moving an employee between day and night patterns inserts two bridging
//! shifts around the change date so the ledger shows neither a gap nor a
//! double shift. This module only synthesizes the drafts; the Scheduling
//! Service runs the full protocol (delete, insert, reassign membership).

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::shift::ShiftDraft;

/// Direction of a shift-pattern change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferProtocol {
    DayToNight,
    NightToDay,
}

/// The two bridging shifts for a pattern change on `change_date`.
///
/// Both drafts historize `target_team_id` and carry no specific activity.
#[must_use]
pub fn transition_drafts(
    protocol: TransferProtocol,
    employee_id: i64,
    target_team_id: i64,
    change_date: NaiveDate,
) -> [ShiftDraft; 2] {
    let next_day = change_date + Duration::days(1);
    match protocol {
        TransferProtocol::DayToNight => [
            bridge(
                employee_id,
                target_team_id,
                at(change_date, 8),
                at(change_date, 14),
                "G>N (Mattina)",
            ),
            bridge(
                employee_id,
                target_team_id,
                at(change_date, 20),
                at(next_day, 6),
                "G>N (Notte)",
            ),
        ],
        TransferProtocol::NightToDay => [
            bridge(
                employee_id,
                target_team_id,
                at(change_date, 20),
                at(next_day, 2),
                "N>G (Notte Corta)",
            ),
            bridge(
                employee_id,
                target_team_id,
                at(next_day, 8),
                at(next_day, 18),
                "N>G (Start Giorno)",
            ),
        ],
    }
}

fn at(day: NaiveDate, hour: u32) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(hour, 0, 0).expect("valid wall-clock hour"))
}

fn bridge(
    employee_id: i64,
    team_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    note: &str,
) -> ShiftDraft {
    ShiftDraft {
        employee_id,
        team_id: Some(team_id),
        start,
        end,
        activity_id: None,
        note: Some(note.to_string()),
    }
}
