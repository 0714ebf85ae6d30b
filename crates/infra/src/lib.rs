//! Infrastructure layer: storage adapters, configuration, ingestion pipeline.

pub mod config;
pub mod ingestion;
pub mod timetable_store;

pub use config::{AppConfig, ConfigError};
pub use ingestion::{IngestError, IngestOutcome, IngestionOrchestrator, VersionRef, UNSAVED_PREVIEW};
pub use timetable_store::{
    InMemoryTimetableStore, PostgresTimetableStore, StoreError, TimetableStore,
};
