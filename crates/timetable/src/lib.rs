//! Timetable domain module.
//!
//! This crate contains the weekly-schedule model and the normalizer that turns
//! untrusted extraction output into that model. It is deterministic domain
//! logic only (no IO, no HTTP, no storage).

pub mod normalize;
pub mod schedule;
pub mod slot;

pub use normalize::{normalize, normalize_with_report, DropReason, DroppedEntry, NormalizeError, NormalizeReport};
pub use schedule::{ClockTime, Schedule, SessionEntry, Weekday};
pub use slot::{TimetableMetadata, TimetableSlot, TimetableVersion};
