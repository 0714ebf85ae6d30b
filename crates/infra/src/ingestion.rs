//! Timetable ingestion: image → extraction → normalization → persistence.
//!
//! ## Flow
//!
//! ```text
//! ingest(image, mime, uploader, slot, cancel)
//!   │
//!   ├─> size check ............ InvalidUpload
//!   ├─> extractor.extract ..... Extraction   (races the cancel token)
//!   ├─> normalize ............. Normalize    (bad cells dropped, not fatal)
//!   ├─> cancel check .......... Cancelled
//!   └─> store.record_ingestion
//!         ok  -> VersionRef::Saved(id)
//!         err -> warn, VersionRef::Unsaved
//! ```
//!
//! ## Error Semantics
//!
//! Extraction and normalization failures abort the call; nothing is retried.
//! Persistence failures do **not** abort: the caller still gets the schedule
//! to review, tagged with the `"unsaved_preview"` sentinel instead of an id.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use rollcall_ai::{ExtractionError, TimetableExtractor};
use rollcall_core::{UserId, VersionId};
use rollcall_timetable::{normalize_with_report, DroppedEntry, NormalizeError, Schedule, TimetableSlot};

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::timetable_store::TimetableStore;

/// Version id returned when the schedule could not be persisted.
pub const UNSAVED_PREVIEW: &str = "unsaved_preview";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("ingestion cancelled")]
    Cancelled,
}

/// Where the ingested schedule ended up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VersionRef {
    Saved(VersionId),
    Unsaved,
}

impl VersionRef {
    pub fn version_id(&self) -> Option<VersionId> {
        match self {
            VersionRef::Saved(id) => Some(*id),
            VersionRef::Unsaved => None,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, VersionRef::Saved(_))
    }
}

impl core::fmt::Display for VersionRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            VersionRef::Saved(id) => write!(f, "{id}"),
            VersionRef::Unsaved => f.write_str(UNSAVED_PREVIEW),
        }
    }
}

impl Serialize for VersionRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub version: VersionRef,
    pub schedule: Schedule,
    pub dropped_entries: Vec<DroppedEntry>,
}

/// Runs one ingestion as an ordered async unit of work.
///
/// Generic over the extractor and the store so tests can swap in stubs; both
/// are shared via `Arc` so one orchestrator serves every request. Trait
/// objects work too (`IngestionOrchestrator<dyn TimetableExtractor, dyn TimetableStore>`).
pub struct IngestionOrchestrator<E: ?Sized, S: ?Sized> {
    extractor: Arc<E>,
    store: Arc<S>,
    max_upload_bytes: usize,
}

impl<E: ?Sized, S: ?Sized> Clone for IngestionOrchestrator<E, S> {
    fn clone(&self) -> Self {
        Self {
            extractor: self.extractor.clone(),
            store: self.store.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

impl<E: ?Sized, S: ?Sized> IngestionOrchestrator<E, S> {
    pub fn new(extractor: Arc<E>, store: Arc<S>) -> Self {
        Self {
            extractor,
            store,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<E, S> IngestionOrchestrator<E, S>
where
    E: TimetableExtractor + ?Sized,
    S: TimetableStore + ?Sized,
{
    #[instrument(
        skip(self, image, slot, cancel),
        fields(slot = %slot, uploader_id = %uploader_id, bytes = image.len()),
        err
    )]
    pub async fn ingest(
        &self,
        image: &[u8],
        mime_type: &str,
        uploader_id: UserId,
        slot: &TimetableSlot,
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome, IngestError> {
        if image.is_empty() {
            return Err(IngestError::InvalidUpload("image is empty".to_string()));
        }
        if image.len() > self.max_upload_bytes {
            return Err(IngestError::InvalidUpload(format!(
                "image is {} bytes; the limit is {}",
                image.len(),
                self.max_upload_bytes
            )));
        }
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        // 1) Extract
        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
            result = self.extractor.extract(image, mime_type) => result?,
        };

        // 2) Normalize
        let report = normalize_with_report(&raw)?;
        for dropped in &report.dropped {
            tracing::warn!(
                day = %dropped.day,
                index = ?dropped.index,
                reason = %dropped.reason,
                "dropping timetable entry"
            );
        }
        tracing::info!(
            entries = report.schedule.entry_count(),
            dropped = report.dropped.len(),
            "timetable normalized"
        );

        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        // 3) Persist (best effort)
        let version = match self
            .store
            .record_ingestion(slot, &report.schedule, uploader_id)
            .await
        {
            Ok(id) => {
                tracing::info!(version_id = %id, "timetable version stored");
                VersionRef::Saved(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist timetable; returning unsaved preview");
                VersionRef::Unsaved
            }
        };

        Ok(IngestOutcome {
            version,
            schedule: report.schedule,
            dropped_entries: report.dropped,
        })
    }
}
