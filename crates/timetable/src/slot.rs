use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{DomainError, DomainResult, Entity, MetadataId, UserId, VersionId};

use crate::schedule::Schedule;

/// The scope one timetable applies to: `(department, semester, section, academicYear)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTimetableSlot")]
pub struct TimetableSlot {
    department: String,
    semester: u16,
    section: String,
    academic_year: String,
}

/// Wire form of a slot; deserialized slots go through [`TimetableSlot::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimetableSlot {
    department: String,
    semester: u16,
    section: String,
    academic_year: String,
}

impl TryFrom<RawTimetableSlot> for TimetableSlot {
    type Error = DomainError;

    fn try_from(raw: RawTimetableSlot) -> Result<Self, Self::Error> {
        Self::new(raw.department, raw.semester, raw.section, raw.academic_year)
    }
}

impl TimetableSlot {
    /// Build a slot from caller input (trimmed; all parts required).
    pub fn new(
        department: impl Into<String>,
        semester: u16,
        section: impl Into<String>,
        academic_year: impl Into<String>,
    ) -> DomainResult<Self> {
        let department = department.into().trim().to_string();
        let section = section.into().trim().to_string();
        let academic_year = academic_year.into().trim().to_string();

        if department.is_empty() {
            return Err(DomainError::validation("department must not be empty"));
        }
        if section.is_empty() {
            return Err(DomainError::validation("section must not be empty"));
        }
        if academic_year.is_empty() {
            return Err(DomainError::validation("academic year must not be empty"));
        }
        if semester == 0 {
            return Err(DomainError::validation("semester must be at least 1"));
        }

        Ok(Self {
            department,
            semester,
            section,
            academic_year,
        })
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn semester(&self) -> u16 {
        self.semester
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn academic_year(&self) -> &str {
        &self.academic_year
    }
}

impl core::fmt::Display for TimetableSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}/sem{}/{}/{}",
            self.department, self.semester, self.section, self.academic_year
        )
    }
}

/// Metadata row for a slot. Created on first successful ingestion, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableMetadata {
    pub id: MetadataId,
    #[serde(flatten)]
    pub slot: TimetableSlot,
    pub created_at: DateTime<Utc>,
}

impl TimetableMetadata {
    pub fn new(slot: TimetableSlot) -> Self {
        Self {
            id: MetadataId::new(),
            slot,
            created_at: Utc::now(),
        }
    }
}

impl Entity for TimetableMetadata {
    type Id = MetadataId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One immutable ingestion result attached to a slot.
///
/// `score` is stored but not interpreted; no ranking between competing
/// versions exists yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableVersion {
    pub id: VersionId,
    pub metadata_id: MetadataId,
    pub uploader_id: UserId,
    pub schedule: Schedule,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

impl TimetableVersion {
    pub fn new(metadata_id: MetadataId, uploader_id: UserId, schedule: Schedule) -> Self {
        Self {
            id: VersionId::new(),
            metadata_id,
            uploader_id,
            schedule,
            score: 0,
            created_at: Utc::now(),
        }
    }
}

impl Entity for TimetableVersion {
    type Id = VersionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_slot_is_validated() {
        let slot: TimetableSlot = serde_json::from_str(
            r#"{"department":" CSE ","semester":5,"section":"G3","academicYear":"2025"}"#,
        )
        .unwrap();
        assert_eq!(slot, TimetableSlot::new("CSE", 5, "G3", "2025").unwrap());

        let blank = serde_json::from_str::<TimetableSlot>(
            r#"{"department":"  ","semester":5,"section":"G3","academicYear":"2025"}"#,
        );
        assert!(blank.unwrap_err().to_string().contains("department must not be empty"));

        let zero = serde_json::from_str::<TimetableSlot>(
            r#"{"department":"CSE","semester":0,"section":"G3","academicYear":"2025"}"#,
        );
        assert!(zero.is_err());
    }

    #[test]
    fn slot_trims_and_validates() {
        let slot = TimetableSlot::new(" CSE ", 5, "G3", "2025").unwrap();
        assert_eq!(slot.department(), "CSE");
        assert_eq!(slot.to_string(), "CSE/sem5/G3/2025");

        assert!(TimetableSlot::new("", 5, "G3", "2025").is_err());
        assert!(TimetableSlot::new("CSE", 0, "G3", "2025").is_err());
        assert!(TimetableSlot::new("CSE", 5, " ", "2025").is_err());
        assert!(TimetableSlot::new("CSE", 5, "G3", "").is_err());
    }

    #[test]
    fn new_version_starts_with_zero_score() {
        let version = TimetableVersion::new(MetadataId::new(), UserId::new(), Schedule::empty());
        assert_eq!(version.score, 0);
    }

    #[test]
    fn metadata_serializes_flat_camel_case() {
        let slot = TimetableSlot::new("CSE", 5, "G3", "2025").unwrap();
        let json = serde_json::to_value(TimetableMetadata::new(slot)).unwrap();
        assert_eq!(json["department"], "CSE");
        assert_eq!(json["academicYear"], "2025");
        assert!(json.get("createdAt").is_some());
    }
}
