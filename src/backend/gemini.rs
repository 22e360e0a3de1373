//! Gemini `generateContent` over REST.
//!
//! Request layout: one `contents` entry whose parts are the inline image
//! followed by the instruction text; `generationConfig` forces JSON output
//! against the response schema. The API key is read from the environment
//! on every call and sent in the `x-goog-api-key` header.

use super::{read_api_key, InferenceBackend, InferenceRequest};
use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, InvoiceError};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// [`InferenceBackend`] for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
}

impl GeminiBackend {
    pub fn new(config: &ExtractorConfig) -> Result<Self, InvoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| InvoiceError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn call(&self, request: &InferenceRequest) -> Result<String, ExtractionError> {
        let api_key = read_api_key(&self.api_key_env)?;
        let body = build_body(request);
        let start = Instant::now();

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        debug!(
            "{}: {} bytes in {:?}",
            self.model,
            bytes.len(),
            start.elapsed()
        );
        response_text(&bytes)
    }
}

impl InferenceBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> BoxFuture<'a, Result<String, ExtractionError>> {
        Box::pin(self.call(request))
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    InlineData(InlineData<'a>),
    Text(&'a str),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_body(request: &InferenceRequest) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: [Content {
            parts: vec![
                Part::InlineData(InlineData {
                    mime_type: request.payload.mime_type(),
                    data: &request.payload.data,
                }),
                Part::Text(&request.instruction),
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &request.schema,
            temperature: request.temperature,
        },
    }
}

/// Concatenated text parts of the first candidate.
fn response_text(body: &[u8]) -> Result<String, ExtractionError> {
    let parsed: GenerateContentResponse = serde_json::from_slice(body)
        .map_err(|e| ExtractionError::Transport(format!("unexpected response envelope: {e}")))?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        warn!("Gemini blocked the prompt: {}", reason);
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(ExtractionError::EmptyResponse);
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason {
            warn!("Gemini returned no text (finish reason: {})", reason);
        }
        return Err(ExtractionError::EmptyResponse);
    }
    Ok(text)
}

fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(env) => env.error.message,
        Err(_) => {
            let raw = String::from_utf8_lossy(body);
            let raw = raw.trim();
            if raw.chars().count() > 200 {
                format!("{}\u{2026}", raw.chars().take(199).collect::<String>())
            } else if raw.is_empty() {
                "empty error body".to_string()
            } else {
                raw.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::Payload;
    use crate::pipeline::input::MediaType;
    use crate::prompts::{extraction_instruction, response_schema};

    fn request() -> InferenceRequest {
        InferenceRequest {
            payload: Payload {
                data: "QUJD".into(),
                media_type: MediaType::Jpeg,
            },
            instruction: extraction_instruction("receipt-01"),
            schema: response_schema(),
            temperature: 0.1,
        }
    }

    #[test]
    fn body_has_inline_image_then_text() {
        let req = request();
        let body = serde_json::to_value(build_body(&req)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert!(parts[1]["text"].as_str().unwrap().contains("receipt-01"));

        let gen = &body["generationConfig"];
        assert_eq!(gen["responseMimeType"], "application/json");
        assert_eq!(gen["responseSchema"]["type"], "OBJECT");
        assert!((gen["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn text_parts_are_concatenated() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"{\"title\":"},{"text":"\"x\"}"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(response_text(body).unwrap(), r#"{"title":"x"}"#);
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let err = response_text(br#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyResponse));
    }

    #[test]
    fn blank_text_is_empty_response() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"  "}]},"finishReason":"MAX_TOKENS"}]}"#;
        assert!(matches!(response_text(body), Err(ExtractionError::EmptyResponse)));
    }

    #[test]
    fn api_error_message_is_extracted() {
        let body = br#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message(b""), "empty error body");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let config = ExtractorConfig::builder()
            .api_key_env("INVOICE_EXTRACT_TEST_UNSET_KEY_91c2")
            .endpoint("http://127.0.0.1:9")
            .build()
            .unwrap();
        let backend = GeminiBackend::new(&config).unwrap();
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(err.is_configuration(), "got: {err}");
    }

    #[test]
    fn url_includes_model() {
        let config = ExtractorConfig::builder()
            .endpoint("https://example.test/v1beta/")
            .model("gemini-2.5-flash")
            .build()
            .unwrap();
        let backend = GeminiBackend::new(&config).unwrap();
        assert_eq!(
            backend.url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
