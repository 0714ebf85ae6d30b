use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use rollcall_core::{Entity, MetadataId, UserId, VersionId};
use rollcall_timetable::{Schedule, TimetableMetadata, TimetableSlot, TimetableVersion};

use super::r#trait::{StoreError, TimetableStore};

#[derive(Debug, Default)]
struct Tables {
    metadata: HashMap<TimetableSlot, TimetableMetadata>,
    versions: HashMap<VersionId, TimetableVersion>,
}

/// In-memory timetable store.
///
/// Intended for tests/dev and for running without a database. Metadata
/// first-creation happens under the write lock, so concurrent upserts for one
/// slot always agree on the id.
#[derive(Debug, Default)]
pub struct InMemoryTimetableStore {
    tables: RwLock<Tables>,
}

impl InMemoryTimetableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata_count(&self) -> usize {
        self.tables.read().map(|t| t.metadata.len()).unwrap_or(0)
    }

    pub fn version_count(&self) -> usize {
        self.tables.read().map(|t| t.versions.len()).unwrap_or(0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

#[async_trait]
impl TimetableStore for InMemoryTimetableStore {
    async fn upsert_metadata(&self, slot: &TimetableSlot) -> Result<MetadataId, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let row = tables
            .metadata
            .entry(slot.clone())
            .or_insert_with(|| TimetableMetadata::new(slot.clone()));
        Ok(*row.id())
    }

    async fn create_version(
        &self,
        metadata_id: MetadataId,
        schedule: &Schedule,
        uploader_id: UserId,
    ) -> Result<VersionId, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;

        // Mirrors the foreign key on the Postgres side.
        if !tables.metadata.values().any(|m| m.id == metadata_id) {
            return Err(StoreError::NotFound(format!("metadata {metadata_id}")));
        }

        let version = TimetableVersion::new(metadata_id, uploader_id, schedule.clone());
        let id = *version.id();
        tables.versions.insert(id, version);
        Ok(id)
    }

    async fn get_version(&self, version_id: VersionId) -> Result<Option<TimetableVersion>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.versions.get(&version_id).cloned())
    }

    async fn list_versions(&self, slot: &TimetableSlot) -> Result<Vec<TimetableVersion>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let Some(metadata) = tables.metadata.get(slot) else {
            return Ok(vec![]);
        };

        let mut versions: Vec<TimetableVersion> = tables
            .versions
            .values()
            .filter(|v| v.metadata_id == metadata.id)
            .cloned()
            .collect();
        // v7 ids are time-ordered; they break ties between equal timestamps.
        versions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(versions)
    }
}
