//! Process configuration, read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ROLLCALL_BIND_ADDR` | `0.0.0.0:8080` |
//! | `DATABASE_URL` | unset (in-memory store) |
//! | `GEMINI_API_KEY` | unset |
//! | `GEMINI_MODEL` | `gemini-2.0-flash` |
//! | `GEMINI_ENDPOINT` | public Gemini v1beta endpoint |
//! | `ROLLCALL_EXTRACTION_TIMEOUT_SECS` | `60` |
//! | `ROLLCALL_MAX_UPLOAD_BYTES` | `5242880` |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use rollcall_ai::GeminiConfig;
use rollcall_ai::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_endpoint: String,
    pub extraction_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = parse_or(
            "ROLLCALL_BIND_ADDR",
            get("ROLLCALL_BIND_ADDR"),
            DEFAULT_BIND_ADDR,
        )?;

        let timeout_secs: u64 = parse_or(
            "ROLLCALL_EXTRACTION_TIMEOUT_SECS",
            get("ROLLCALL_EXTRACTION_TIMEOUT_SECS"),
            &DEFAULT_EXTRACTION_TIMEOUT_SECS.to_string(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "ROLLCALL_EXTRACTION_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_upload_bytes: usize = parse_or(
            "ROLLCALL_MAX_UPLOAD_BYTES",
            get("ROLLCALL_MAX_UPLOAD_BYTES"),
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;
        if max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                var: "ROLLCALL_MAX_UPLOAD_BYTES",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_endpoint: get("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            extraction_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
        })
    }

    /// Settings for the Gemini extraction client. The API key is required.
    pub fn gemini(&self) -> Result<GeminiConfig, ConfigError> {
        let key = self
            .gemini_api_key
            .clone()
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        Ok(GeminiConfig::new(key)
            .with_model(self.gemini_model.clone())
            .with_endpoint(self.gemini_endpoint.clone())
            .with_timeout(self.extraction_timeout))
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .as_deref()
        .unwrap_or(default)
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        })
}
