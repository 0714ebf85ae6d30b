//! `rollcall-ai`
//!
//! **Responsibility:** boundary to the external image-understanding service.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It knows nothing about schedules; it returns raw text.
//! - It owns the instruction prompt and the cleanup of the service's output.
//! - It never retries; retry policy belongs to callers.

pub mod extractor;
pub mod gemini;
pub mod prompt;

pub use extractor::{check_mime_type, ExtractionError, TimetableExtractor};
pub use gemini::{GeminiConfig, GeminiExtractor};
pub use prompt::{strip_code_fences, TIMETABLE_PROMPT};
