//! Presence and worked-hours policy.
//!
//! Converts a wall-clock interval into presence hours (elapsed time) and
//! worked hours (presence minus the unpaid-break deduction), and splits a
//! daily total into regular and overtime hours. Pure and deterministic;
//! rounding happens only at the persistence boundary via [`round_hours`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for time intervals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// The interval end is not strictly after its start.
    #[error("interval end {end} is not after start {start}")]
    EndNotAfterStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// Parameters governing how presence converts to worked hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursPolicy {
    /// Presence above this many hours triggers the unpaid-break deduction.
    pub break_threshold_hours: f64,

    /// Length of the unpaid break deducted from long segments.
    pub break_deduction_hours: f64,

    /// Daily worked hours above this count as overtime.
    pub daily_overtime_threshold: f64,
}

impl Default for HoursPolicy {
    fn default() -> Self {
        Self {
            break_threshold_hours: 6.0,
            break_deduction_hours: 0.5,
            daily_overtime_threshold: 8.0,
        }
    }
}

/// Computed hours for one attendance segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHours {
    /// Elapsed wall-clock duration in hours.
    pub presence: f64,
    /// Presence minus policy deductions. Never exceeds presence, never
    /// falls below zero.
    pub worked: f64,
}

impl HoursPolicy {
    /// Computes presence and worked hours for the interval `[start, end)`.
    ///
    /// Fails if `end` is not strictly after `start`.
    #[expect(
        clippy::cast_precision_loss,
        reason = "segment durations are far below the f64 integer limit"
    )]
    pub fn segment_hours(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<SegmentHours, IntervalError> {
        if end <= start {
            return Err(IntervalError::EndNotAfterStart { start, end });
        }
        let presence = (end - start).num_seconds() as f64 / 3600.0;
        let worked = if presence > self.break_threshold_hours {
            (presence - self.break_deduction_hours).clamp(0.0, presence)
        } else {
            presence
        };
        Ok(SegmentHours { presence, worked })
    }
}

/// Splits a daily total into `(regular, overtime)` hours.
///
/// Regular hours are capped at `daily_threshold`; everything above it is
/// overtime.
#[must_use]
pub fn split_regular_overtime(total_hours: f64, daily_threshold: f64) -> (f64, f64) {
    let regular = total_hours.min(daily_threshold);
    let overtime = (total_hours - daily_threshold).max(0.0);
    (regular, overtime)
}

/// Rounds hours to two decimal places for persistence.
#[must_use]
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}
