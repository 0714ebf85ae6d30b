use serde::{Deserialize, Serialize};

use rollcall_attendance::{Projection, RiskLevel, Scenario, SubjectAttendanceRecord, UNATTAINABLE};
use rollcall_core::DomainResult;
use rollcall_infra::{IngestOutcome, VersionRef};
use rollcall_timetable::{DroppedEntry, Schedule, TimetableSlot, TimetableVersion};

// -------------------------
// Request DTOs
// -------------------------

/// Slot filter for `GET /timetable/versions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsQuery {
    pub department: String,
    pub semester: u16,
    pub section: String,
    pub academic_year: String,
}

impl VersionsQuery {
    pub fn slot(&self) -> DomainResult<TimetableSlot> {
        TimetableSlot::new(
            self.department.as_str(),
            self.semester,
            self.section.as_str(),
            self.academic_year.as_str(),
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhatIfMode {
    Attend,
    Miss,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfRequest {
    pub attended_classes: u32,
    pub total_classes: u32,
    pub required_percentage: u32,
    pub mode: WhatIfMode,
    pub classes: u32,
}

impl WhatIfRequest {
    pub fn record(&self) -> DomainResult<SubjectAttendanceRecord> {
        SubjectAttendanceRecord::new(self.attended_classes, self.total_classes, self.required_percentage)
    }

    pub fn scenario(&self) -> Scenario {
        match self.mode {
            WhatIfMode::Attend => Scenario::Attend(self.classes),
            WhatIfMode::Miss => Scenario::Miss(self.classes),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub version_id: VersionRef,
    pub data: Schedule,
    pub dropped_entries: Vec<DroppedEntry>,
}

impl From<IngestOutcome> for UploadResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            success: true,
            version_id: outcome.version,
            data: outcome.schedule,
            dropped_entries: outcome.dropped_entries,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsResponse {
    pub slot: TimetableSlot,
    pub versions: Vec<TimetableVersion>,
}

/// `mustAttend` is `null` when the requirement cannot be reached.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub percentage: u32,
    pub risk: RiskLevel,
    pub safe_bunk_budget: u32,
    pub must_attend: Option<u32>,
}

impl From<Projection> for ProjectionResponse {
    fn from(p: Projection) -> Self {
        Self {
            percentage: p.percentage,
            risk: p.risk,
            safe_bunk_budget: p.safe_bunk_budget,
            must_attend: (p.must_attend != UNATTAINABLE).then_some(p.must_attend),
        }
    }
}
