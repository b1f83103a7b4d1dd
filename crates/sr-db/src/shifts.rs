//! Master-shift and attendance-segment primitives.
//!
//! Overlap semantics: two half-open intervals `[s1, e1)` and `[s2, e2)`
//! overlap iff `s1 < e2 AND e1 > s2` — touching endpoints do not overlap.
//! Every overlap and overwrite query in this module uses that predicate,
//! compared directly on the fixed-width timestamp text.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::{Ledger, StoreError, day_start, format_timestamp, parse_timestamp};

/// The authoritative scheduled interval for one employee.
///
/// `team_id` is the team snapshot taken at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterShiftRecord {
    pub id: String,
    pub employee_id: i64,
    pub team_id: Option<i64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub activity_id: Option<String>,
    pub note: Option<String>,
}

/// A day-bounded slice of a master shift with computed hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub id: String,
    pub shift_id: Option<String>,
    pub employee_id: i64,
    pub activity_id: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub presence_hours: f64,
    pub worked_hours: f64,
    pub category: String,
    pub note: Option<String>,
}

type ShiftRow = (
    String,
    i64,
    Option<i64>,
    String,
    String,
    Option<String>,
    Option<String>,
);

type SegmentRow = (
    String,
    Option<String>,
    i64,
    Option<String>,
    String,
    String,
    f64,
    f64,
    String,
    Option<String>,
);

impl Ledger<'_> {
    // ---- master shifts ----

    pub fn insert_master_shift(&self, shift: &MasterShiftRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "
            INSERT INTO master_shifts (id, employee_id, team_id, start_at, end_at, activity_id, note)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                shift.id,
                shift.employee_id,
                shift.team_id,
                format_timestamp(shift.start),
                format_timestamp(shift.end),
                shift.activity_id,
                shift.note,
            ],
        )?;
        Ok(())
    }

    pub fn get_master_shift(&self, id: &str) -> Result<MasterShiftRecord, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, employee_id, team_id, start_at, end_at, activity_id, note
                 FROM master_shifts WHERE id = ?",
                [id],
                map_shift_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "master shift",
                id: id.to_string(),
            })?;
        shift_from_row(row)
    }

    /// Lists an employee's master shifts in chronological order.
    pub fn list_master_shifts(
        &self,
        employee_id: i64,
    ) -> Result<Vec<MasterShiftRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, employee_id, team_id, start_at, end_at, activity_id, note
             FROM master_shifts WHERE employee_id = ?
             ORDER BY start_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([employee_id], map_shift_row)?;
        let mut shifts = Vec::new();
        for row in rows {
            shifts.push(shift_from_row(row?)?);
        }
        Ok(shifts)
    }

    /// Updates a shift's window, activity and note in place. The caller must
    /// also regenerate the shift's segments.
    pub fn update_master_shift(
        &self,
        id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        activity_id: Option<&str>,
        note: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE master_shifts SET start_at = ?, end_at = ?, activity_id = ?, note = ?
             WHERE id = ?",
            params![
                format_timestamp(start),
                format_timestamp(end),
                activity_id,
                note,
                id
            ],
        )?;
        require_shift(changed, id)
    }

    /// Deletes a master shift; its segments cascade.
    pub fn delete_master_shift(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM master_shifts WHERE id = ?", [id])?;
        require_shift(changed, id)
    }

    /// Whether any of the employee's shifts overlaps `[start, end)`,
    /// optionally ignoring one shift id.
    pub fn overlaps_exist(
        &self,
        employee_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let exists: bool = self.conn.query_row(
            "
            SELECT EXISTS(
                SELECT 1 FROM master_shifts
                WHERE employee_id = ?1 AND start_at < ?2 AND end_at > ?3
                  AND (?4 IS NULL OR id <> ?4)
            )
            ",
            params![
                employee_id,
                format_timestamp(end),
                format_timestamp(start),
                exclude_id
            ],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Removes every shift of the employee overlapping `[start, end)`;
    /// segments cascade. Returns the number of shifts removed.
    pub fn delete_overlapping(
        &self,
        employee_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM master_shifts
             WHERE employee_id = ?1 AND start_at < ?2 AND end_at > ?3",
            params![
                employee_id,
                format_timestamp(end),
                format_timestamp(start)
            ],
        )?;
        Ok(removed)
    }

    /// Shifts of the employee starting on the given calendar day.
    pub fn shifts_for_employee_on(
        &self,
        employee_id: i64,
        day: NaiveDate,
    ) -> Result<Vec<MasterShiftRecord>, StoreError> {
        self.shifts_starting_between(employee_id, day_start(day), day_start(day) + Duration::days(1))
    }

    fn shifts_starting_between(
        &self,
        employee_id: i64,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<MasterShiftRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, employee_id, team_id, start_at, end_at, activity_id, note
             FROM master_shifts
             WHERE employee_id = ? AND start_at >= ? AND start_at < ?
             ORDER BY start_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            params![employee_id, format_timestamp(from), format_timestamp(until)],
            map_shift_row,
        )?;
        let mut shifts = Vec::new();
        for row in rows {
            shifts.push(shift_from_row(row?)?);
        }
        Ok(shifts)
    }

    /// Removes every shift of the employee STARTING in `[from, until)`.
    /// Shifts that started earlier are kept even if they end inside the
    /// window. Returns the number of shifts removed.
    pub fn delete_shifts_starting_between(
        &self,
        employee_id: i64,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM master_shifts
             WHERE employee_id = ? AND start_at >= ? AND start_at < ?",
            params![employee_id, format_timestamp(from), format_timestamp(until)],
        )?;
        Ok(removed)
    }

    // ---- attendance segments ----

    /// Inserts a batch of segments and returns how many were written.
    pub fn insert_segments(&self, segments: &[SegmentRecord]) -> Result<usize, StoreError> {
        if segments.is_empty() {
            return Ok(0);
        }
        let mut stmt = self.conn.prepare(
            "
            INSERT INTO attendance_segments
            (id, shift_id, employee_id, activity_id, start_at, end_at,
             presence_hours, worked_hours, category, note)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )?;
        for segment in segments {
            stmt.execute(params![
                segment.id,
                segment.shift_id,
                segment.employee_id,
                segment.activity_id,
                format_timestamp(segment.start),
                format_timestamp(segment.end),
                segment.presence_hours,
                segment.worked_hours,
                segment.category,
                segment.note,
            ])?;
        }
        tracing::debug!(count = segments.len(), "segments inserted");
        Ok(segments.len())
    }

    pub fn delete_segments_for_shift(&self, shift_id: &str) -> Result<usize, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM attendance_segments WHERE shift_id = ?", [shift_id])?;
        Ok(removed)
    }

    /// A shift's segments in chronological order.
    pub fn segments_for_shift(&self, shift_id: &str) -> Result<Vec<SegmentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, shift_id, employee_id, activity_id, start_at, end_at,
                    presence_hours, worked_hours, category, note
             FROM attendance_segments
             WHERE shift_id = ?
             ORDER BY start_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([shift_id], map_segment_row)?;
        let mut segments = Vec::new();
        for row in rows {
            segments.push(segment_from_row(row?)?);
        }
        Ok(segments)
    }
}

fn map_shift_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShiftRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn shift_from_row(
    (id, employee_id, team_id, start, end, activity_id, note): ShiftRow,
) -> Result<MasterShiftRecord, StoreError> {
    Ok(MasterShiftRecord {
        id,
        employee_id,
        team_id,
        start: parse_timestamp(&start)?,
        end: parse_timestamp(&end)?,
        activity_id,
        note,
    })
}

fn map_segment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SegmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn segment_from_row(
    (id, shift_id, employee_id, activity_id, start, end, presence, worked, category, note): SegmentRow,
) -> Result<SegmentRecord, StoreError> {
    Ok(SegmentRecord {
        id,
        shift_id,
        employee_id,
        activity_id,
        start: parse_timestamp(&start)?,
        end: parse_timestamp(&end)?,
        presence_hours: presence,
        worked_hours: worked,
        category,
        note,
    })
}

fn require_shift(changed: usize, id: &str) -> Result<(), StoreError> {
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity: "master shift",
            id: id.to_string(),
        });
    }
    Ok(())
}
