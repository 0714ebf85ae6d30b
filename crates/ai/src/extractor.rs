use async_trait::async_trait;
use thiserror::Error;

/// A call to the external image-understanding service.
///
/// Implementations take the uploaded image and return the service's text
/// output with Markdown fences already stripped. The text is *not* trusted:
/// callers must run it through the schedule normalizer.
#[async_trait]
pub trait TimetableExtractor: Send + Sync + 'static {
    async fn extract(&self, image: &[u8], mime_type: &str) -> Result<String, ExtractionError>;
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction service unreachable: {0}")]
    Unreachable(String),

    #[error("extraction service timed out")]
    Timeout,

    #[error("extraction service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("extraction service returned no text content")]
    NonTextResponse,

    #[error("unsupported image type: {0}")]
    UnsupportedMimeType(String),

    #[error("extraction client misconfigured: {0}")]
    Configuration(String),
}

/// Only raster images are sent to the vision model.
pub fn check_mime_type(mime_type: &str) -> Result<(), ExtractionError> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some(("image", subtype)) if !subtype.is_empty() => Ok(()),
        _ => Err(ExtractionError::UnsupportedMimeType(mime_type.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_image_types_only() {
        assert!(check_mime_type("image/png").is_ok());
        assert!(check_mime_type("image/jpeg; charset=binary").is_ok());
        assert!(matches!(
            check_mime_type("application/pdf"),
            Err(ExtractionError::UnsupportedMimeType(_))
        ));
        assert!(check_mime_type("image/").is_err());
        assert!(check_mime_type("").is_err());
    }
}
