//! Postgres-backed timetable store.
//!
//! ## Schema
//!
//! - `timetable_metadata`: one row per slot, unique on
//!   `(department, semester, section, academic_year)`.
//! - `timetable_versions`: append-only, `schedule` stored as `JSONB`,
//!   `metadata_id` references `timetable_metadata(id)`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Pool timeout / pool closed / IO / TLS | `Unavailable` |
//! | Foreign key violation (`23503`) | `NotFound` |
//! | Row decode failures | `Serialization` |
//! | Anything else | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Executor, PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use rollcall_core::{MetadataId, UserId, VersionId};
use rollcall_timetable::{Schedule, TimetableSlot, TimetableVersion};

use super::r#trait::{StoreError, TimetableStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS timetable_metadata (
        id UUID PRIMARY KEY,
        department TEXT NOT NULL,
        semester INTEGER NOT NULL CHECK (semester > 0),
        section TEXT NOT NULL,
        academic_year TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (department, semester, section, academic_year)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS timetable_versions (
        id UUID PRIMARY KEY,
        metadata_id UUID NOT NULL REFERENCES timetable_metadata (id),
        uploader_id UUID NOT NULL,
        schedule JSONB NOT NULL,
        score INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS timetable_versions_metadata_idx
        ON timetable_versions (metadata_id, created_at)
    "#,
];

/// Postgres-backed timetable store.
///
/// Metadata upsert is a single `INSERT ... ON CONFLICT ... DO UPDATE ...
/// RETURNING id`, so concurrent first uploads for one slot converge on the
/// same row without a read-then-write race. `record_ingestion` wraps upsert and
/// version insert in one transaction.
#[derive(Debug, Clone)]
pub struct PostgresTimetableStore {
    pool: Arc<PgPool>,
}

impl PostgresTimetableStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the tables and index if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

async fn upsert_metadata_with<'c, E>(executor: E, slot: &TimetableSlot) -> Result<MetadataId, StoreError>
where
    E: Executor<'c, Database = Postgres>,
{
    // The no-op update makes RETURNING yield the existing row on conflict.
    let row = sqlx::query(
        r#"
        INSERT INTO timetable_metadata (id, department, semester, section, academic_year)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (department, semester, section, academic_year)
        DO UPDATE SET department = EXCLUDED.department
        RETURNING id
        "#,
    )
    .bind(*MetadataId::new().as_uuid())
    .bind(slot.department())
    .bind(i32::from(slot.semester()))
    .bind(slot.section())
    .bind(slot.academic_year())
    .fetch_one(executor)
    .await
    .map_err(|e| map_sqlx_error("upsert_metadata", e))?;

    let id: Uuid = row
        .try_get("id")
        .map_err(|e| StoreError::Serialization(format!("metadata id: {e}")))?;
    Ok(MetadataId::from_uuid(id))
}

async fn insert_version_with<'c, E>(executor: E, version: &TimetableVersion) -> Result<(), StoreError>
where
    E: Executor<'c, Database = Postgres>,
{
    let schedule = serde_json::to_value(&version.schedule)
        .map_err(|e| StoreError::Serialization(format!("schedule: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO timetable_versions (id, metadata_id, uploader_id, schedule, score, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(*version.id.as_uuid())
    .bind(*version.metadata_id.as_uuid())
    .bind(*version.uploader_id.as_uuid())
    .bind(schedule)
    .bind(version.score)
    .bind(version.created_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("create_version", e))?;

    Ok(())
}

#[async_trait]
impl TimetableStore for PostgresTimetableStore {
    #[instrument(skip(self, slot), fields(slot = %slot), err)]
    async fn upsert_metadata(&self, slot: &TimetableSlot) -> Result<MetadataId, StoreError> {
        upsert_metadata_with(&*self.pool, slot).await
    }

    #[instrument(
        skip_all,
        fields(metadata_id = %metadata_id, uploader_id = %uploader_id),
        err
    )]
    async fn create_version(
        &self,
        metadata_id: MetadataId,
        schedule: &Schedule,
        uploader_id: UserId,
    ) -> Result<VersionId, StoreError> {
        let version = TimetableVersion::new(metadata_id, uploader_id, schedule.clone());
        insert_version_with(&*self.pool, &version).await?;
        Ok(version.id)
    }

    #[instrument(
        skip_all,
        fields(slot = %slot, uploader_id = %uploader_id),
        err
    )]
    async fn record_ingestion(
        &self,
        slot: &TimetableSlot,
        schedule: &Schedule,
        uploader_id: UserId,
    ) -> Result<VersionId, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let metadata_id = upsert_metadata_with(&mut *tx, slot).await?;
        let version = TimetableVersion::new(metadata_id, uploader_id, schedule.clone());
        insert_version_with(&mut *tx, &version).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(version.id)
    }

    #[instrument(skip_all, fields(version_id = %version_id), err)]
    async fn get_version(&self, version_id: VersionId) -> Result<Option<TimetableVersion>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, metadata_id, uploader_id, schedule, score, created_at
            FROM timetable_versions
            WHERE id = $1
            "#,
        )
        .bind(*version_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_version", e))?;

        row.as_ref().map(version_from_row).transpose()
    }

    #[instrument(skip(self, slot), fields(slot = %slot), err)]
    async fn list_versions(&self, slot: &TimetableSlot) -> Result<Vec<TimetableVersion>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.metadata_id, v.uploader_id, v.schedule, v.score, v.created_at
            FROM timetable_versions v
            JOIN timetable_metadata m ON m.id = v.metadata_id
            WHERE m.department = $1 AND m.semester = $2 AND m.section = $3 AND m.academic_year = $4
            ORDER BY v.created_at ASC, v.id ASC
            "#,
        )
        .bind(slot.department())
        .bind(i32::from(slot.semester()))
        .bind(slot.section())
        .bind(slot.academic_year())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_versions", e))?;

        tracing::debug!(count = rows.len(), "loaded versions");
        rows.iter().map(version_from_row).collect()
    }
}

fn version_from_row(row: &PgRow) -> Result<TimetableVersion, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Serialization(format!("version row: {e}"));

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let metadata_id: Uuid = row.try_get("metadata_id").map_err(decode)?;
    let uploader_id: Uuid = row.try_get("uploader_id").map_err(decode)?;
    let schedule: serde_json::Value = row.try_get("schedule").map_err(decode)?;
    let score: i32 = row.try_get("score").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    let schedule: Schedule = serde_json::from_value(schedule)
        .map_err(|e| StoreError::Serialization(format!("stored schedule: {e}")))?;

    Ok(TimetableVersion {
        id: VersionId::from_uuid(id),
        metadata_id: MetadataId::from_uuid(metadata_id),
        uploader_id: UserId::from_uuid(uploader_id),
        schedule,
        score,
        created_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") => StoreError::NotFound(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {operation}: {e}")),
        decode @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
            StoreError::Serialization(format!("decode error in {operation}: {decode}"))
        }
        other => StoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}
