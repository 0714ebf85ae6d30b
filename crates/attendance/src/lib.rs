//! Attendance projection engine.
//!
//! Pure functions over a subject's attendance counters: risk classification,
//! how many classes can still be missed, and how many must be attended. No IO,
//! no shared state; every call recomputes from the record it is given.

pub mod projection;
pub mod record;

pub use projection::{
    attendance_percentage, classify, must_attend_count, project, safe_bunk_budget, simulate, Projection,
    RiskLevel, Scenario, WhatIf, SAFE_BUNK_CAP, SAFE_THRESHOLD, UNATTAINABLE,
};
pub use record::{SubjectAttendanceRecord, MAX_CLASSES};
