use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use rollcall_ai::ExtractionError;
use rollcall_core::DomainError;
use rollcall_infra::{IngestError, StoreError};

/// Non-standard "client closed request" status.
const CLIENT_CLOSED_REQUEST: u16 = 499;

pub fn ingest_error_to_response(err: &IngestError) -> axum::response::Response {
    match err {
        IngestError::Extraction(ExtractionError::UnsupportedMimeType(mime)) => json_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_media_type",
            format!("timetableImage must be an image (got {mime})"),
        ),
        IngestError::Extraction(e) => json_error(StatusCode::BAD_GATEWAY, "extraction_failed", e.to_string()),
        IngestError::Normalize(e) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "normalize_failed", e.to_string())
        }
        IngestError::InvalidUpload(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_upload", msg.clone()),
        IngestError::Cancelled => json_error(
            StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::REQUEST_TIMEOUT),
            "cancelled",
            "request was cancelled",
        ),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        StoreError::Unavailable(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg),
        StoreError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
        StoreError::Storage(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn domain_error_to_response(code: &'static str, err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
