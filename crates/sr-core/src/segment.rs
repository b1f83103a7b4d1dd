//! Day-boundary shift segmentation.
//!
//! A master shift is decomposed into attendance segments split exactly at
//! local midnight. A shift contained in one calendar day (or ending exactly
//! at the next midnight) yields one segment; a shift crossing midnight yields
//! two, annotated "(Part 1)" and "(Part 2)". The emitted segments always
//! reconstruct the original half-open interval with no gap and no overlap.
//!
//! Each part's hours are computed over its own sub-interval, not by dividing
//! the parent total. Intervals longer than 24 hours would need a general
//! day-tiling pass and are rejected instead.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hours::{HoursPolicy, IntervalError, round_hours};

/// Longest shift the single-midnight split supports.
pub const MAX_SHIFT_HOURS: i64 = 24;

/// Errors from shift segmentation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// The shift interval itself was invalid.
    #[error(transparent)]
    Interval(#[from] IntervalError),

    /// The shift is longer than [`MAX_SHIFT_HOURS`] and would cross more
    /// than one midnight.
    #[error("shift from {start} to {end} exceeds {MAX_SHIFT_HOURS} hours")]
    ExceedsOneDay {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// A day-bounded slice of a shift, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDraft {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Elapsed hours, rounded to two decimals.
    pub presence_hours: f64,
    /// Presence minus policy deductions, rounded to two decimals.
    pub worked_hours: f64,
    pub note: Option<String>,
}

/// Splits `[start, end)` at the local-midnight boundary.
///
/// Returns one draft for same-day shifts (including shifts ending exactly at
/// the next midnight) and two for shifts crossing midnight. Hours for each
/// draft are computed by `policy` over that draft's own sub-interval.
pub fn split_shift(
    start: NaiveDateTime,
    end: NaiveDateTime,
    note: Option<&str>,
    policy: &HoursPolicy,
) -> Result<Vec<SegmentDraft>, SegmentError> {
    if end <= start {
        return Err(IntervalError::EndNotAfterStart { start, end }.into());
    }
    if end - start > Duration::hours(MAX_SHIFT_HOURS) {
        return Err(SegmentError::ExceedsOneDay { start, end });
    }
    if start.date() == end.date() {
        return Ok(vec![draft(start, end, note.map(str::to_string), policy)?]);
    }

    let midnight = start
        .date()
        .succ_opt()
        .expect("a later calendar day exists when end is on one")
        .and_time(NaiveTime::MIN);
    if end == midnight {
        // Touches midnight without crossing it.
        return Ok(vec![draft(start, end, note.map(str::to_string), policy)?]);
    }

    Ok(vec![
        draft(start, midnight, Some(part_note(note, 1)), policy)?,
        draft(midnight, end, Some(part_note(note, 2)), policy)?,
    ])
}

fn draft(
    start: NaiveDateTime,
    end: NaiveDateTime,
    note: Option<String>,
    policy: &HoursPolicy,
) -> Result<SegmentDraft, SegmentError> {
    let hours = policy.segment_hours(start, end)?;
    Ok(SegmentDraft {
        start,
        end,
        presence_hours: round_hours(hours.presence),
        worked_hours: round_hours(hours.worked),
        note,
    })
}

fn part_note(note: Option<&str>, part: u8) -> String {
    match note {
        Some(text) => format!("{text} (Part {part})"),
        None => format!("(Part {part})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn same_day_shift_yields_one_segment() {
        let policy = HoursPolicy::default();
        let segments = split_shift(at(10, 8), at(10, 18), Some("regular"), &policy).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, at(10, 8));
        assert_eq!(segments[0].end, at(10, 18));
        assert_eq!(segments[0].note.as_deref(), Some("regular"));
    }

    #[test]
    fn midnight_crossing_splits_in_two() {
        let policy = HoursPolicy::default();
        let segments = split_shift(at(10, 16), at(11, 8), Some("long haul"), &policy).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, at(10, 16));
        assert_eq!(segments[0].end, at(11, 0));
        assert_eq!(segments[1].start, at(11, 0));
        assert_eq!(segments[1].end, at(11, 8));
        assert_eq!(segments[0].note.as_deref(), Some("long haul (Part 1)"));
        assert_eq!(segments[1].note.as_deref(), Some("long haul (Part 2)"));
    }

    #[test]
    fn ending_exactly_at_midnight_does_not_split() {
        let policy = HoursPolicy::default();
        let segments = split_shift(at(10, 20), at(11, 0), None, &policy).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].end, at(11, 0));
        assert_eq!(segments[0].note, None);
    }

    #[test]
    fn split_parts_reconstruct_the_interval() {
        let policy = HoursPolicy::default();
        let segments = split_shift(at(10, 16), at(11, 8), None, &policy).unwrap();
        assert_eq!(segments[0].end, segments[1].start);
        assert_eq!(segments[0].start, at(10, 16));
        assert_eq!(segments[1].end, at(11, 8));
    }

    #[test]
    fn part_hours_cover_the_parent_presence() {
        let policy = HoursPolicy::default();
        let segments = split_shift(at(10, 16), at(11, 8), None, &policy).unwrap();
        let total: f64 = segments.iter().map(|s| s.presence_hours).sum();
        let parent = policy.segment_hours(at(10, 16), at(11, 8)).unwrap();
        assert!((total - parent.presence).abs() < 0.01);
    }

    #[test]
    fn missing_note_gets_bare_part_markers() {
        let policy = HoursPolicy::default();
        let segments = split_shift(at(10, 22), at(11, 4), None, &policy).unwrap();
        assert_eq!(segments[0].note.as_deref(), Some("(Part 1)"));
        assert_eq!(segments[1].note.as_deref(), Some("(Part 2)"));
    }

    #[test]
    fn over_24_hours_is_rejected() {
        let policy = HoursPolicy::default();
        let result = split_shift(at(10, 8), at(11, 9), None, &policy);
        assert!(matches!(result, Err(SegmentError::ExceedsOneDay { .. })));
    }

    #[test]
    fn exactly_24_hours_is_allowed() {
        let policy = HoursPolicy::default();
        let segments = split_shift(at(10, 10), at(11, 10), None, &policy).unwrap();
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn empty_interval_is_rejected() {
        let policy = HoursPolicy::default();
        assert!(split_shift(at(10, 8), at(10, 8), None, &policy).is_err());
    }
}
