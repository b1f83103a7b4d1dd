//! Hours reports for the reporting/export collaborator.

use chrono::NaiveDate;
use serde::Serialize;

use sr_core::{round_hours, split_regular_overtime};

use crate::{SchedulingService, ServiceError};

/// Per-employee, per-day hours with the regular/overtime breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursReportRow {
    pub employee_id: i64,
    pub employee_name: String,
    pub day: NaiveDate,
    pub presence_hours: f64,
    pub worked_hours: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
}

impl SchedulingService {
    /// Aggregates worked hours per employee and day over `[from_day,
    /// until_day)`, splitting each day's total at the policy's daily
    /// overtime threshold.
    pub fn hours_report(
        &self,
        from_day: NaiveDate,
        until_day: NaiveDate,
    ) -> Result<Vec<HoursReportRow>, ServiceError> {
        let threshold = self.policy().daily_overtime_threshold;
        let totals = self.store().read().employee_day_totals(from_day, until_day)?;
        Ok(totals
            .into_iter()
            .map(|row| {
                let (regular, overtime) = split_regular_overtime(row.worked_hours, threshold);
                HoursReportRow {
                    employee_id: row.employee_id,
                    employee_name: row.employee_name,
                    day: row.day,
                    presence_hours: row.presence_hours,
                    worked_hours: row.worked_hours,
                    regular_hours: round_hours(regular),
                    overtime_hours: round_hours(overtime),
                }
            })
            .collect())
    }
}
