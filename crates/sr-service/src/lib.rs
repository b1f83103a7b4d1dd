//! Scheduling service for the shift roster.
//!
//! Orchestrates the ledger store and the segmentation engine: batch shift
//! creation under a conflict policy, single-shift update and deletion,
//! interruption splitting, the team-transfer protocol, and read-side
//! reports. Every mutating operation runs inside one store transaction —
//! commit on success, full rollback on any error, no partial-success state.
//!
//! The service holds an explicit [`Store`] handle and an [`HoursPolicy`];
//! there is no ambient global state.

pub mod config;
mod error;
mod report;

pub use config::Config;
pub use error::ServiceError;
pub use report::HoursReportRow;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sr_core::{HoursPolicy, ShiftDraft, TransferProtocol, split_shift, transition_drafts};
use sr_db::{
    CalendarRow, DEFAULT_SEGMENT_CATEGORY, Ledger, MasterShiftRecord, SegmentRecord, Store,
};

/// How a new shift reconciles against an existing overlapping one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Abort the whole batch on the first overlap; nothing is written.
    Error,
    /// Leave the existing shift in place and skip the conflicting draft.
    Skip,
    /// Delete every overlapping shift (segments cascade) before inserting.
    Overwrite,
}

/// Structured result of a batch creation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub created_shift_ids: Vec<String>,
    pub created_segment_count: usize,
    pub skipped_employee_ids: Vec<i64>,
    pub overwritten_employee_ids: Vec<i64>,
}

/// Structured result of a team transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    /// Shifts removed by the smart-delete step.
    pub shifts_removed: usize,
    /// Insertion result for the two bridging shifts.
    pub transition: BatchOutcome,
}

/// Orchestration layer over the ledger store and segmentation engine.
pub struct SchedulingService {
    store: Store,
    policy: HoursPolicy,
}

impl SchedulingService {
    /// Builds a service over an already-migrated store.
    #[must_use]
    pub const fn new(store: Store, policy: HoursPolicy) -> Self {
        Self { store, policy }
    }

    /// The underlying store, for direct read access.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn policy(&self) -> &HoursPolicy {
        &self.policy
    }

    /// Creates a batch of shifts under one conflict policy, atomically.
    ///
    /// Drafts are processed in input order. An invalid interval, a conflict
    /// under [`ConflictPolicy::Error`], or any storage failure rolls back
    /// the entire batch.
    pub fn create_batch(
        &mut self,
        drafts: &[ShiftDraft],
        conflict_policy: ConflictPolicy,
    ) -> Result<BatchOutcome, ServiceError> {
        let policy = self.policy.clone();
        self.store.transaction(|ledger| {
            let mut outcome = BatchOutcome::default();
            create_drafts_in(ledger, &policy, drafts, conflict_policy, &mut outcome)?;
            tracing::debug!(
                created = outcome.created_shift_ids.len(),
                segments = outcome.created_segment_count,
                skipped = outcome.skipped_employee_ids.len(),
                overwritten = outcome.overwritten_employee_ids.len(),
                "batch created"
            );
            Ok(outcome)
        })
    }

    /// Instantiates a standard template on `day` and submits it as a batch
    /// of one.
    pub fn create_from_template(
        &mut self,
        employee_id: i64,
        team_id: Option<i64>,
        template_code: &str,
        day: NaiveDate,
        activity_id: Option<&str>,
        note: Option<&str>,
        conflict_policy: ConflictPolicy,
    ) -> Result<BatchOutcome, ServiceError> {
        let policy = self.policy.clone();
        self.store.transaction(|ledger| {
            let template = ledger.get_template(template_code)?;
            let (start, end) = template.instantiate(day);
            let draft = ShiftDraft {
                employee_id,
                team_id,
                start,
                end,
                activity_id: activity_id.map(str::to_string),
                note: note.map(str::to_string),
            };
            let mut outcome = BatchOutcome::default();
            create_drafts_in(
                ledger,
                &policy,
                std::slice::from_ref(&draft),
                conflict_policy,
                &mut outcome,
            )?;
            Ok(outcome)
        })
    }

    /// Moves a shift's window and replaces its segments atomically.
    ///
    /// Does NOT re-check overlap against the employee's other shifts: the
    /// operation exists to push manual corrections through known conflicts.
    /// Callers that want validation first can use
    /// [`Ledger::overlaps_exist`] with the shift id excluded.
    pub fn update_shift(
        &mut self,
        id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        activity_id: Option<&str>,
        note: Option<&str>,
    ) -> Result<usize, ServiceError> {
        let policy = self.policy.clone();
        self.store.transaction(|ledger| {
            let original = ledger.get_master_shift(id)?;
            let drafts = split_shift(start, end, note, &policy)?;
            ledger.delete_segments_for_shift(id)?;
            ledger.update_master_shift(id, start, end, activity_id, note)?;
            let segments = segment_records(&drafts, id, original.employee_id, activity_id);
            Ok(ledger.insert_segments(&segments)?)
        })
    }

    /// Deletes a master shift; its segments cascade.
    pub fn delete_shift(&mut self, id: &str) -> Result<(), ServiceError> {
        self.store
            .transaction(|ledger| Ok(ledger.delete_master_shift(id)?))
    }

    /// Removes `[interruption_start, interruption_end)` from an existing
    /// shift, replacing it with up to two shifts bracketing the hole.
    ///
    /// The "before" shift is tagged "(Ante)" and the "after" shift "(Post)";
    /// both preserve the original's historized team and activity and are
    /// re-segmented at the midnight boundary. Bounds outside the original
    /// interval clamp to its edges, so an interruption covering the whole
    /// shift simply deletes it.
    pub fn split_for_interruption(
        &mut self,
        id: &str,
        interruption_start: NaiveDateTime,
        interruption_end: NaiveDateTime,
    ) -> Result<BatchOutcome, ServiceError> {
        if interruption_start >= interruption_end {
            return Err(ServiceError::InvalidInterruption {
                start: interruption_start,
                end: interruption_end,
            });
        }
        let policy = self.policy.clone();
        self.store.transaction(|ledger| {
            let original = ledger.get_master_shift(id)?;
            ledger.delete_master_shift(id)?;

            let mut drafts = Vec::new();
            let before_end = interruption_start.min(original.end);
            if before_end > original.start {
                drafts.push(bracket_draft(&original, original.start, before_end, "Ante"));
            }
            let after_start = interruption_end.max(original.start);
            if after_start < original.end {
                drafts.push(bracket_draft(&original, after_start, original.end, "Post"));
            }

            let mut outcome = BatchOutcome::default();
            for draft in &drafts {
                let (shift_id, count) = insert_shift(ledger, &policy, draft)?;
                outcome.created_shift_ids.push(shift_id);
                outcome.created_segment_count += count;
            }
            tracing::debug!(
                shift_id = id,
                replacements = outcome.created_shift_ids.len(),
                "shift split for interruption"
            );
            Ok(outcome)
        })
    }

    /// Runs the team-transfer protocol in one transaction: smart-delete the
    /// employee's shifts starting on `change_date` or the day after,
    /// insert the two bridging shifts under the `overwrite` policy, and
    /// reassign live membership to the target team.
    ///
    /// Historized team references on shifts that survive the smart delete
    /// are left untouched.
    pub fn execute_team_transfer(
        &mut self,
        employee_id: i64,
        target_team_id: i64,
        protocol: TransferProtocol,
        change_date: NaiveDate,
    ) -> Result<TransferOutcome, ServiceError> {
        let policy = self.policy.clone();
        self.store.transaction(|ledger| {
            ledger.get_employee(employee_id)?;
            ledger.get_team(target_team_id)?;

            let window_start = change_date.and_time(NaiveTime::MIN);
            let window_end = (change_date + Duration::days(2)).and_time(NaiveTime::MIN);
            let shifts_removed =
                ledger.delete_shifts_starting_between(employee_id, window_start, window_end)?;

            let drafts = transition_drafts(protocol, employee_id, target_team_id, change_date);
            let mut transition = BatchOutcome::default();
            create_drafts_in(
                ledger,
                &policy,
                &drafts,
                ConflictPolicy::Overwrite,
                &mut transition,
            )?;

            ledger.reassign_employee_team(employee_id, target_team_id)?;

            tracing::debug!(
                employee_id,
                target_team_id,
                ?protocol,
                shifts_removed,
                "team transfer executed"
            );
            Ok(TransferOutcome {
                shifts_removed,
                transition,
            })
        })
    }

    /// Calendar rows for one day.
    pub fn calendar_day(&self, day: NaiveDate) -> Result<Vec<CalendarRow>, ServiceError> {
        Ok(self.store.read().calendar_day(day)?)
    }

    /// Calendar rows for the half-open day range `[from_day, until_day)`.
    pub fn calendar_range(
        &self,
        from_day: NaiveDate,
        until_day: NaiveDate,
    ) -> Result<Vec<CalendarRow>, ServiceError> {
        Ok(self.store.read().calendar_range(from_day, until_day)?)
    }
}

/// Processes drafts in order against one transaction-scoped ledger view.
fn create_drafts_in(
    ledger: &Ledger<'_>,
    policy: &HoursPolicy,
    drafts: &[ShiftDraft],
    conflict_policy: ConflictPolicy,
    outcome: &mut BatchOutcome,
) -> Result<(), ServiceError> {
    for draft in drafts {
        // Validate the interval before any conflict handling writes.
        let segment_drafts = split_shift(draft.start, draft.end, draft.note.as_deref(), policy)?;

        if ledger.overlaps_exist(draft.employee_id, draft.start, draft.end, None)? {
            match conflict_policy {
                ConflictPolicy::Error => {
                    return Err(ServiceError::Conflict {
                        employee_id: draft.employee_id,
                        start: draft.start,
                        end: draft.end,
                    });
                }
                ConflictPolicy::Skip => {
                    tracing::warn!(
                        employee_id = draft.employee_id,
                        start = %draft.start,
                        end = %draft.end,
                        "overlapping draft skipped"
                    );
                    outcome.skipped_employee_ids.push(draft.employee_id);
                    continue;
                }
                ConflictPolicy::Overwrite => {
                    let removed =
                        ledger.delete_overlapping(draft.employee_id, draft.start, draft.end)?;
                    tracing::warn!(
                        employee_id = draft.employee_id,
                        removed,
                        "overlapping shifts overwritten"
                    );
                    outcome.overwritten_employee_ids.push(draft.employee_id);
                }
            }
        }

        let shift_id = Uuid::new_v4().to_string();
        ledger.insert_master_shift(&MasterShiftRecord {
            id: shift_id.clone(),
            employee_id: draft.employee_id,
            team_id: draft.team_id,
            start: draft.start,
            end: draft.end,
            activity_id: draft.activity_id.clone(),
            note: draft.note.clone(),
        })?;
        let segments = segment_records(
            &segment_drafts,
            &shift_id,
            draft.employee_id,
            draft.activity_id.as_deref(),
        );
        outcome.created_segment_count += ledger.insert_segments(&segments)?;
        outcome.created_shift_ids.push(shift_id);
    }
    Ok(())
}

/// Inserts one draft and its segments, without conflict handling.
fn insert_shift(
    ledger: &Ledger<'_>,
    policy: &HoursPolicy,
    draft: &ShiftDraft,
) -> Result<(String, usize), ServiceError> {
    let segment_drafts = split_shift(draft.start, draft.end, draft.note.as_deref(), policy)?;
    let shift_id = Uuid::new_v4().to_string();
    ledger.insert_master_shift(&MasterShiftRecord {
        id: shift_id.clone(),
        employee_id: draft.employee_id,
        team_id: draft.team_id,
        start: draft.start,
        end: draft.end,
        activity_id: draft.activity_id.clone(),
        note: draft.note.clone(),
    })?;
    let segments = segment_records(
        &segment_drafts,
        &shift_id,
        draft.employee_id,
        draft.activity_id.as_deref(),
    );
    let count = ledger.insert_segments(&segments)?;
    Ok((shift_id, count))
}

fn segment_records(
    drafts: &[sr_core::SegmentDraft],
    shift_id: &str,
    employee_id: i64,
    activity_id: Option<&str>,
) -> Vec<SegmentRecord> {
    drafts
        .iter()
        .map(|draft| SegmentRecord {
            id: Uuid::new_v4().to_string(),
            shift_id: Some(shift_id.to_string()),
            employee_id,
            activity_id: activity_id.map(str::to_string),
            start: draft.start,
            end: draft.end,
            presence_hours: draft.presence_hours,
            worked_hours: draft.worked_hours,
            category: DEFAULT_SEGMENT_CATEGORY.to_string(),
            note: draft.note.clone(),
        })
        .collect()
}

fn bracket_draft(
    original: &MasterShiftRecord,
    start: NaiveDateTime,
    end: NaiveDateTime,
    tag: &str,
) -> ShiftDraft {
    let note = match original.note.as_deref() {
        Some(text) => format!("{text} ({tag})"),
        None => format!("({tag})"),
    };
    ShiftDraft {
        employee_id: original.employee_id,
        team_id: original.team_id,
        start,
        end,
        activity_id: original.activity_id.clone(),
        note: Some(note),
    }
}
