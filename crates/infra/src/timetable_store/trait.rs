use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use rollcall_core::{MetadataId, UserId, VersionId};
use rollcall_timetable::{Schedule, TimetableSlot, TimetableVersion};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Persistence for timetable metadata and versions.
///
/// ## Contract
///
/// - `upsert_metadata` is idempotent per slot. Concurrent first uploads for
///   the same slot must resolve to exactly one metadata id.
/// - `create_version` always inserts a new row; versions are never updated.
/// - `record_ingestion` runs both steps as one unit of work. The default
///   composes the two calls; stores with transactions should override it so
///   a failed version insert leaves nothing behind.
#[async_trait]
pub trait TimetableStore: Send + Sync + 'static {
    async fn upsert_metadata(&self, slot: &TimetableSlot) -> Result<MetadataId, StoreError>;

    async fn create_version(
        &self,
        metadata_id: MetadataId,
        schedule: &Schedule,
        uploader_id: UserId,
    ) -> Result<VersionId, StoreError>;

    async fn record_ingestion(
        &self,
        slot: &TimetableSlot,
        schedule: &Schedule,
        uploader_id: UserId,
    ) -> Result<VersionId, StoreError> {
        let metadata_id = self.upsert_metadata(slot).await?;
        self.create_version(metadata_id, schedule, uploader_id).await
    }

    async fn get_version(&self, version_id: VersionId) -> Result<Option<TimetableVersion>, StoreError>;

    /// Versions recorded for a slot, oldest first. Unknown slots yield an empty list.
    async fn list_versions(&self, slot: &TimetableSlot) -> Result<Vec<TimetableVersion>, StoreError>;
}

#[async_trait]
impl<S> TimetableStore for Arc<S>
where
    S: TimetableStore + ?Sized,
{
    async fn upsert_metadata(&self, slot: &TimetableSlot) -> Result<MetadataId, StoreError> {
        (**self).upsert_metadata(slot).await
    }

    async fn create_version(
        &self,
        metadata_id: MetadataId,
        schedule: &Schedule,
        uploader_id: UserId,
    ) -> Result<VersionId, StoreError> {
        (**self).create_version(metadata_id, schedule, uploader_id).await
    }

    async fn record_ingestion(
        &self,
        slot: &TimetableSlot,
        schedule: &Schedule,
        uploader_id: UserId,
    ) -> Result<VersionId, StoreError> {
        (**self).record_ingestion(slot, schedule, uploader_id).await
    }

    async fn get_version(&self, version_id: VersionId) -> Result<Option<TimetableVersion>, StoreError> {
        (**self).get_version(version_id).await
    }

    async fn list_versions(&self, slot: &TimetableSlot) -> Result<Vec<TimetableVersion>, StoreError> {
        (**self).list_versions(slot).await
    }
}
