//! Read projections for calendars and reports.
//!
//! Rows join the attendance segment with the employee, the historized team
//! recorded on the owning master shift (not live membership), and the
//! computed hours. Range filters are half-open over calendar days.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::{Ledger, StoreError, day_start, format_timestamp, parse_timestamp};

/// One calendar line: a segment with its employee and historized team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarRow {
    pub segment_id: String,
    pub shift_id: Option<String>,
    pub employee_id: i64,
    pub employee_name: String,
    pub role: String,
    /// Name of the team recorded on the master shift at creation time.
    pub team_name: Option<String>,
    pub activity_id: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub presence_hours: f64,
    pub worked_hours: f64,
    pub category: String,
    pub note: Option<String>,
}

/// Per-employee, per-day totals over attendance segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTotalsRow {
    pub employee_id: i64,
    pub employee_name: String,
    pub day: NaiveDate,
    pub presence_hours: f64,
    pub worked_hours: f64,
}

impl Ledger<'_> {
    /// Calendar rows for one day, ordered by segment start.
    pub fn calendar_day(&self, day: NaiveDate) -> Result<Vec<CalendarRow>, StoreError> {
        self.calendar_range(day, day + Duration::days(1))
    }

    /// Calendar rows for the half-open day range `[from_day, until_day)`.
    pub fn calendar_range(
        &self,
        from_day: NaiveDate,
        until_day: NaiveDate,
    ) -> Result<Vec<CalendarRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.id, s.shift_id, s.employee_id, e.first_name, e.last_name, e.role,
                   t.name, s.activity_id, s.start_at, s.end_at,
                   s.presence_hours, s.worked_hours, s.category, s.note
            FROM attendance_segments s
            JOIN employees e ON e.id = s.employee_id
            LEFT JOIN master_shifts m ON m.id = s.shift_id
            LEFT JOIN teams t ON t.id = m.team_id
            WHERE s.start_at >= ? AND s.start_at < ?
            ORDER BY s.start_at ASC, s.id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                format_timestamp(day_start(from_day)),
                format_timestamp(day_start(until_day))
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, f64>(10)?,
                    row.get::<_, f64>(11)?,
                    row.get::<_, String>(12)?,
                    row.get::<_, Option<String>>(13)?,
                ))
            },
        )?;

        let mut calendar = Vec::new();
        for row in rows {
            let (
                segment_id,
                shift_id,
                employee_id,
                first_name,
                last_name,
                role,
                team_name,
                activity_id,
                start,
                end,
                presence_hours,
                worked_hours,
                category,
                note,
            ) = row?;
            calendar.push(CalendarRow {
                segment_id,
                shift_id,
                employee_id,
                employee_name: format!("{first_name} {last_name}"),
                role,
                team_name,
                activity_id,
                start: parse_timestamp(&start)?,
                end: parse_timestamp(&end)?,
                presence_hours,
                worked_hours,
                category,
                note,
            });
        }
        Ok(calendar)
    }

    /// Per-employee, per-day presence/worked totals over `[from_day, until_day)`.
    pub fn employee_day_totals(
        &self,
        from_day: NaiveDate,
        until_day: NaiveDate,
    ) -> Result<Vec<DayTotalsRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.employee_id, e.first_name, e.last_name, date(s.start_at) AS day,
                   SUM(s.presence_hours), SUM(s.worked_hours)
            FROM attendance_segments s
            JOIN employees e ON e.id = s.employee_id
            WHERE s.start_at >= ? AND s.start_at < ?
            GROUP BY s.employee_id, day
            ORDER BY day ASC, e.last_name ASC, e.first_name ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                format_timestamp(day_start(from_day)),
                format_timestamp(day_start(until_day))
            ],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            },
        )?;

        let mut totals = Vec::new();
        for row in rows {
            let (employee_id, first_name, last_name, day, presence_hours, worked_hours) = row?;
            let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|source| {
                StoreError::TimestampParse { value: day, source }
            })?;
            totals.push(DayTotalsRow {
                employee_id,
                employee_name: format!("{first_name} {last_name}"),
                day,
                presence_hours,
                worked_hours,
            });
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_SEGMENT_CATEGORY, MasterShiftRecord, SegmentRecord, test_store};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn seed_shift(
        ledger: &crate::Ledger<'_>,
        shift_id: &str,
        employee_id: i64,
        team_id: Option<i64>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        presence: f64,
    ) {
        ledger
            .insert_master_shift(&MasterShiftRecord {
                id: shift_id.to_string(),
                employee_id,
                team_id,
                start,
                end,
                activity_id: Some("A-1".to_string()),
                note: None,
            })
            .unwrap();
        ledger
            .insert_segments(&[SegmentRecord {
                id: format!("{shift_id}-seg"),
                shift_id: Some(shift_id.to_string()),
                employee_id,
                activity_id: Some("A-1".to_string()),
                start,
                end,
                presence_hours: presence,
                worked_hours: presence,
                category: DEFAULT_SEGMENT_CATEGORY.to_string(),
                note: None,
            }])
            .unwrap();
    }

    #[test]
    fn calendar_joins_employee_and_historized_team() {
        let store = test_store();
        let ledger = store.read();
        let ada = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        let team = ledger.create_team("Day crew", None).unwrap();
        seed_shift(&ledger, "shift-1", ada, Some(team), at(10, 8), at(10, 18), 10.0);

        let rows = ledger.calendar_day(day(10)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_name, "Ada Lovelace");
        assert_eq!(rows[0].role, "operator");
        assert_eq!(rows[0].team_name.as_deref(), Some("Day crew"));
        assert_eq!(rows[0].activity_id.as_deref(), Some("A-1"));
        assert_eq!(rows[0].category, DEFAULT_SEGMENT_CATEGORY);
    }

    #[test]
    fn membership_changes_do_not_rewrite_past_calendar_rows() {
        let store = test_store();
        let ledger = store.read();
        let ada = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        let day_crew = ledger.create_team("Day crew", None).unwrap();
        let night_crew = ledger.create_team("Night crew", None).unwrap();
        ledger.replace_team_members(day_crew, &[ada]).unwrap();
        seed_shift(&ledger, "shift-1", ada, Some(day_crew), at(10, 8), at(10, 18), 10.0);

        ledger.reassign_employee_team(ada, night_crew).unwrap();

        let rows = ledger.calendar_day(day(10)).unwrap();
        assert_eq!(rows[0].team_name.as_deref(), Some("Day crew"));
    }

    #[test]
    fn range_filter_is_half_open_over_days() {
        let store = test_store();
        let ledger = store.read();
        let ada = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        seed_shift(&ledger, "shift-1", ada, None, at(9, 8), at(9, 18), 10.0);
        seed_shift(&ledger, "shift-2", ada, None, at(10, 8), at(10, 18), 10.0);
        seed_shift(&ledger, "shift-3", ada, None, at(11, 8), at(11, 18), 10.0);

        let rows = ledger.calendar_range(day(9), day(11)).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.segment_id.as_str()).collect();
        assert_eq!(ids, vec!["shift-1-seg", "shift-2-seg"]);
    }

    #[test]
    fn day_totals_group_per_employee_and_day() {
        let store = test_store();
        let ledger = store.read();
        let ada = ledger.create_employee("Ada", "Lovelace", "operator").unwrap();
        let grace = ledger.create_employee("Grace", "Hopper", "lead").unwrap();
        seed_shift(&ledger, "shift-1", ada, None, at(10, 8), at(10, 12), 4.0);
        seed_shift(&ledger, "shift-2", ada, None, at(10, 13), at(10, 18), 5.0);
        seed_shift(&ledger, "shift-3", grace, None, at(10, 8), at(10, 18), 10.0);
        seed_shift(&ledger, "shift-4", ada, None, at(11, 8), at(11, 12), 4.0);

        let totals = ledger.employee_day_totals(day(10), day(12)).unwrap();
        assert_eq!(totals.len(), 3);

        let ada_day_10 = totals
            .iter()
            .find(|t| t.employee_id == ada && t.day == day(10))
            .unwrap();
        assert!((ada_day_10.presence_hours - 9.0).abs() < 0.01);

        let ada_day_11 = totals
            .iter()
            .find(|t| t.employee_id == ada && t.day == day(11))
            .unwrap();
        assert!((ada_day_11.presence_hours - 4.0).abs() < 0.01);
    }
}
