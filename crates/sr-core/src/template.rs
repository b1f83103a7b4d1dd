//! Standard shift templates.
//!
//! Read-mostly reference data describing recurring shift shapes. A template
//! only carries times of day; [`ShiftTemplate::instantiate`] anchors it to a
//! calendar day, placing the end on the following day when the template
//! crosses midnight.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A recurring shift shape identified by a textual code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTemplate {
    pub code: String,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub crosses_midnight: bool,
}

impl ShiftTemplate {
    /// Absolute start and end of an instance of this template on `day`.
    #[must_use]
    pub fn instantiate(&self, day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let end_day = if self.crosses_midnight {
            day + Duration::days(1)
        } else {
            day
        };
        (day.and_time(self.start_time), end_day.and_time(self.end_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn day_template_stays_on_one_day() {
        let template = ShiftTemplate {
            code: "DAY".to_string(),
            name: "Day shift".to_string(),
            start_time: time(8),
            end_time: time(18),
            crosses_midnight: false,
        };
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = template.instantiate(day);
        assert_eq!(start, day.and_time(time(8)));
        assert_eq!(end, day.and_time(time(18)));
    }

    #[test]
    fn night_template_ends_on_the_next_day() {
        let template = ShiftTemplate {
            code: "NIGHT".to_string(),
            name: "Night shift".to_string(),
            start_time: time(20),
            end_time: time(6),
            crosses_midnight: true,
        };
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = template.instantiate(day);
        assert_eq!(start, day.and_time(time(20)));
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap().and_time(time(6))
        );
        assert!(end > start);
    }

    #[test]
    fn template_serde_roundtrip() {
        let template = ShiftTemplate {
            code: "MORNING".to_string(),
            name: "Morning shift".to_string(),
            start_time: time(8),
            end_time: time(14),
            crosses_midnight: false,
        };
        let json = serde_json::to_string(&template).unwrap();
        let parsed: ShiftTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, template);
    }
}
