//! Core domain logic for the shift roster.
//!
//! This crate contains the pure scheduling building blocks:
//! - Hours policy: presence/worked-hours computation and the regular/overtime split
//! - Segmentation: decomposing a shift at the local-midnight boundary
//! - Templates: standard shift shapes instantiated onto a calendar day
//! - Transfer: synthesizing the bridging shifts of a day/night pattern change
//!
//! Everything here is deterministic and free of I/O; persistence lives in
//! `sr-db` and orchestration in `sr-service`.

pub mod hours;
pub mod segment;
pub mod shift;
pub mod template;
pub mod transfer;

pub use hours::{HoursPolicy, IntervalError, SegmentHours, round_hours, split_regular_overtime};
pub use segment::{SegmentDraft, SegmentError, split_shift};
pub use shift::ShiftDraft;
pub use template::ShiftTemplate;
pub use transfer::{TransferProtocol, transition_drafts};
