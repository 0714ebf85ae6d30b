use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use rollcall_ai::{ExtractionError, GeminiExtractor, TimetableExtractor};
use rollcall_infra::{
    AppConfig, ConfigError, InMemoryTimetableStore, IngestionOrchestrator, PostgresTimetableStore,
    TimetableStore,
};

/// Shared, request-independent services.
pub struct AppServices {
    pub ingestion: IngestionOrchestrator<dyn TimetableExtractor, dyn TimetableStore>,
    pub store: Arc<dyn TimetableStore>,
}

impl AppServices {
    pub fn new(
        extractor: Arc<dyn TimetableExtractor>,
        store: Arc<dyn TimetableStore>,
        max_upload_bytes: usize,
    ) -> Self {
        let ingestion =
            IngestionOrchestrator::new(extractor, store.clone()).with_max_upload_bytes(max_upload_bytes);
        Self { ingestion, store }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extractor(#[from] ExtractionError),

    #[error("invalid database configuration: {0}")]
    Database(#[from] sqlx::Error),
}

/// Wire the production services from configuration.
///
/// Without `DATABASE_URL` the in-memory store is used. A database that is
/// configured but unreachable does not block startup: uploads still succeed
/// and return unsaved previews until it comes back.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let extractor: Arc<dyn TimetableExtractor> = Arc::new(GeminiExtractor::new(config.gemini()?)?);

    let store: Arc<dyn TimetableStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(5))
                .connect_lazy(url)?;
            let store = PostgresTimetableStore::new(pool);
            if let Err(err) = store.ensure_schema().await {
                tracing::warn!(error = %err, "could not prepare timetable schema");
            }
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; timetable versions are kept in memory");
            Arc::new(InMemoryTimetableStore::new())
        }
    };

    Ok(AppServices::new(extractor, store, config.max_upload_bytes))
}
