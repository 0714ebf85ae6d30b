use serde::{Deserialize, Serialize};

use rollcall_core::{DomainError, DomainResult};

/// Largest class count a record may carry. Keeps the step-by-step
/// projections bounded for untrusted input.
pub const MAX_CLASSES: u32 = 100_000;

/// Attendance counters for one subject, as owned by the course CRUD layer.
///
/// The projection engine only reads these. `required_percentage` is normally
/// 0–100, but larger values are representable so the engine can answer them
/// (with a sentinel) instead of refusing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendanceRecord {
    pub attended_classes: u32,
    pub total_classes: u32,
    pub required_percentage: u32,
}

impl SubjectAttendanceRecord {
    /// Build a record, rejecting `attended > total`.
    pub fn new(attended_classes: u32, total_classes: u32, required_percentage: u32) -> DomainResult<Self> {
        let record = Self {
            attended_classes,
            total_classes,
            required_percentage,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.total_classes > MAX_CLASSES {
            return Err(DomainError::validation(format!(
                "total classes ({}) exceeds the limit of {MAX_CLASSES}",
                self.total_classes
            )));
        }
        if self.attended_classes > self.total_classes {
            return Err(DomainError::validation(format!(
                "attended classes ({}) cannot exceed total classes ({})",
                self.attended_classes, self.total_classes
            )));
        }
        Ok(())
    }

    pub fn missed_classes(&self) -> u32 {
        self.total_classes.saturating_sub(self.attended_classes)
    }
}
