//! Gemini `generateContent` client.
//!
//! Sends the timetable prompt plus the image as inline base64 data and returns
//! the concatenated text parts of the first candidate.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::extractor::{check_mime_type, ExtractionError, TimetableExtractor};
use crate::prompt::{strip_code_fences, TIMETABLE_PROMPT};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const USER_AGENT: &str = concat!("rollcall/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Extraction client backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiExtractor {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiExtractor {
    pub fn new(config: GeminiConfig) -> Result<Self, ExtractionError> {
        if config.api_key.trim().is_empty() {
            return Err(ExtractionError::Configuration("API key is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractionError::Configuration(e.to_string()))?;

        Ok(Self {
            http_client,
            url: format!(
                "{}/models/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl TimetableExtractor for GeminiExtractor {
    async fn extract(&self, image: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
        check_mime_type(mime_type)?;

        let body = GenerateContentRequest::for_image(TIMETABLE_PROMPT, image, mime_type);

        tracing::debug!(bytes = image.len(), mime_type, url = %self.url, "calling vision service");

        let response = self
            .http_client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(map_transport_error)?;
        let text = parsed.text().ok_or(ExtractionError::NonTextResponse)?;

        tracing::info!(chars = text.len(), "vision service returned text");
        Ok(strip_code_fences(&text))
    }
}

fn map_transport_error(e: reqwest::Error) -> ExtractionError {
    if e.is_timeout() {
        ExtractionError::Timeout
    } else if e.is_decode() {
        ExtractionError::NonTextResponse
    } else {
        ExtractionError::Unreachable(e.to_string())
    }
}

// -------------------------
// Wire types
// -------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn for_image(prompt: &str, image: &[u8], mime_type: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate; `None` if there are none.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

#[cfg(test)]
mod tests {
    use rollcall_timetable::{normalize, NormalizeError, Weekday};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    /// Reads one request (head and body) and returns it as text.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + body_len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answers a single `generateContent` call on a local port.
    ///
    /// Returns the endpoint to point the client at and a handle yielding the
    /// request that was received.
    async fn serve_once(status: u16, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let reply = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{addr}/v1beta"), handle)
    }

    fn reply_with_text(text: &str) -> String {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
        .to_string()
    }

    fn local_client(endpoint: &str) -> GeminiExtractor {
        GeminiExtractor::new(
            GeminiConfig::new("test-key")
                .with_endpoint(endpoint)
                .with_model("gemini-test")
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap()
    }

    #[test]
    fn request_carries_prompt_and_inline_image() {
        let req = GenerateContentRequest::for_image("PROMPT", &[0xde, 0xad, 0xbe, 0xef], "image/png");
        let json = serde_json::to_value(&req).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "PROMPT");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "3q2+7w==");
    }

    #[test]
    fn response_text_joins_parts() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"```json\n{"},{"text":"}\n```"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("```json\n{}\n```"));
    }

    #[test]
    fn response_without_text_is_none() {
        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(blocked.text().is_none());

        let no_text: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"inlineData":{}}]}}]}"#).unwrap();
        assert!(no_text.text().is_none());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = GeminiExtractor::new(GeminiConfig::new("  ")).unwrap_err();
        assert!(matches!(err, ExtractionError::Configuration(_)));
    }

    #[test]
    fn url_is_built_from_endpoint_and_model() {
        let client = GeminiExtractor::new(
            GeminiConfig::new("key")
                .with_endpoint("http://localhost:1234/v1beta/")
                .with_model("gemini-test"),
        )
        .unwrap();
        assert_eq!(client.url, "http://localhost:1234/v1beta/models/gemini-test:generateContent");
    }

    #[tokio::test]
    async fn rejects_non_image_before_calling_service() {
        let client = GeminiExtractor::new(GeminiConfig::new("key")).unwrap();
        let err = client.extract(b"%PDF", "application/pdf").await.unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedMimeType(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_reported() {
        let client = GeminiExtractor::new(
            GeminiConfig::new("key")
                .with_endpoint("http://127.0.0.1:9")
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap();
        let err = client.extract(b"png", "image/png").await.unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Unreachable(_) | ExtractionError::Timeout
        ));
    }

    #[tokio::test]
    async fn extract_strips_fences_from_the_reply() {
        let fenced = "```json\n{\"Monday\": [{\"subject\": \"CS101\", \"startTime\": \"09:00\", \"endTime\": \"10:00\"}]}\n```";
        let (endpoint, server) = serve_once(200, reply_with_text(fenced)).await;

        let text = local_client(&endpoint).extract(b"png", "image/png").await.unwrap();
        assert_eq!(
            text,
            r#"{"Monday": [{"subject": "CS101", "startTime": "09:00", "endTime": "10:00"}]}"#
        );

        let schedule = normalize(&text).unwrap();
        assert_eq!(schedule.day(Weekday::Monday)[0].subject, "CS101");

        let request = server.await.unwrap();
        let head = request.to_ascii_lowercase();
        assert!(head.starts_with("post /v1beta/models/gemini-test:generatecontent "));
        assert!(head.contains("x-goog-api-key: test-key"));
        assert!(request.contains(r#""mime_type":"image/png""#));
    }

    #[tokio::test]
    async fn malformed_fenced_reply_fails_normalization() {
        let (endpoint, _server) = serve_once(200, reply_with_text("```json\n{\"Monday\": [\n```")).await;

        let text = local_client(&endpoint).extract(b"png", "image/png").await.unwrap();
        assert_eq!(text, r#"{"Monday": ["#);

        let err = normalize(&text).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let (endpoint, _server) = serve_once(429, r#"{"error":"quota"}"#.to_string()).await;

        let err = local_client(&endpoint).extract(b"png", "image/png").await.unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Api { status: 429, ref body } if body == r#"{"error":"quota"}"#
        ));
    }

    #[tokio::test]
    async fn reply_without_text_is_non_text() {
        let (endpoint, _server) = serve_once(200, r#"{"candidates":[]}"#.to_string()).await;

        let err = local_client(&endpoint).extract(b"png", "image/png").await.unwrap_err();
        assert!(matches!(err, ExtractionError::NonTextResponse));
    }
}
