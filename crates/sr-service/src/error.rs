//! Service-level error taxonomy.

use chrono::NaiveDateTime;
use thiserror::Error;

use sr_core::{IntervalError, SegmentError};
use sr_db::StoreError;

/// Errors surfaced by the scheduling service.
///
/// Validation errors are raised before any write; conflicts under the
/// `error` policy and store failures abort and roll back the enclosing
/// transaction. Every variant names the employee, interval, or id at fault.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A shift interval failed validation.
    #[error(transparent)]
    Interval(#[from] IntervalError),

    /// The shift could not be segmented (invalid or longer than a day).
    #[error(transparent)]
    Segmentation(#[from] SegmentError),

    /// An existing shift overlaps the requested interval under the `error`
    /// conflict policy.
    #[error("employee {employee_id} already has a shift overlapping {start}..{end}")]
    Conflict {
        employee_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Interruption bounds are empty or inverted.
    #[error("invalid interruption window {start}..{end}")]
    InvalidInterruption {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Not-found, constraint, or storage failure from the ledger store.
    #[error(transparent)]
    Store(#[from] StoreError),
}
