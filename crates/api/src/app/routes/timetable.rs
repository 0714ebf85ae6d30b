use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError},
        rejection::QueryRejection,
        DefaultBodyLimit, Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;

use rollcall_core::VersionId;
use rollcall_timetable::TimetableSlot;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

/// Multipart field holding the timetable image.
pub const IMAGE_FIELD: &str = "timetableImage";

pub fn router(upload_body_limit: usize) -> Router {
    Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/versions", get(list_versions))
        .route("/versions/:id", get(get_version))
}

#[derive(Debug, Default)]
struct UploadForm {
    image: Option<(Bytes, String)>,
    department: Option<String>,
    semester: Option<String>,
    section: Option<String>,
    academic_year: Option<String>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                IMAGE_FIELD => {
                    let mime_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    form.image = Some((field.bytes().await?, mime_type));
                }
                "department" => form.department = Some(field.text().await?),
                "semester" => form.semester = Some(field.text().await?),
                "section" => form.section = Some(field.text().await?),
                "academicYear" => form.academic_year = Some(field.text().await?),
                // Unknown fields are ignored.
                _ => {}
            }
        }

        Ok(form)
    }

    fn slot(&self) -> Result<TimetableSlot, String> {
        fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, String> {
            value.as_deref().ok_or_else(|| format!("{name} is required"))
        }

        let semester = required(&self.semester, "semester")?;
        let semester: u16 = semester
            .trim()
            .parse()
            .map_err(|_| format!("semester must be a positive number (got {semester:?})"))?;

        TimetableSlot::new(
            required(&self.department, "department")?,
            semester,
            required(&self.section, "section")?,
            required(&self.academic_year, "academicYear")?,
        )
        .map_err(|e| e.to_string())
    }
}

pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let form = match UploadForm::read(&mut multipart).await {
        Ok(form) => form,
        Err(e) => return errors::json_error(e.status(), "invalid_upload", e.body_text()),
    };

    let slot = match form.slot() {
        Ok(slot) => slot,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_slot", msg),
    };

    let Some((image, mime_type)) = form.image else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_upload",
            format!("{IMAGE_FIELD} is required"),
        );
    };

    // Runs on its own task. If this handler is dropped, the guard cancels it
    // and it stops before persisting.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let task = tokio::spawn(async move {
        services
            .ingestion
            .ingest(&image, &mime_type, user.user_id(), &slot, &cancel)
            .await
    });

    match task.await {
        Ok(Ok(outcome)) => (StatusCode::OK, Json(dto::UploadResponse::from(outcome))).into_response(),
        Ok(Err(err)) => errors::ingest_error_to_response(&err),
        Err(join_err) => {
            tracing::error!(error = %join_err, "ingestion task failed");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "ingestion task failed",
            )
        }
    }
}

pub async fn get_version(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let version_id = match VersionId::from_str(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response("invalid_id", e),
    };

    match services.store.get_version(version_id).await {
        Ok(Some(version)) => (StatusCode::OK, Json(version)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "timetable version not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_versions(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::VersionsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::json_error(rejection.status(), "invalid_slot", rejection.body_text()),
    };

    let slot = match query.slot() {
        Ok(slot) => slot,
        Err(e) => return errors::domain_error_to_response("invalid_slot", e),
    };

    match services.store.list_versions(&slot).await {
        Ok(versions) => (StatusCode::OK, Json(dto::VersionsResponse { slot, versions })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
