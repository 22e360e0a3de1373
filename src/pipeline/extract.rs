//! Extraction client: one payload → one validated [`ExtractedData`].
//!
//! Builds the request from [`crate::prompts`], hands it to the configured
//! [`InferenceBackend`], and turns the answer into typed items. Parsing is
//! strict in two steps: syntax first (`MalformedJson`), then shape and
//! value ranges (`SchemaMismatch`). After validation every item's `name`
//! is overwritten with the display name and `remarks` is cleared. The
//! model's values for those two fields are never used, whatever it
//! returned.

use crate::backend::{InferenceBackend, InferenceRequest};
use crate::error::ExtractionError;
use crate::output::ExtractedData;
use crate::pipeline::encode::Payload;
use crate::pipeline::postprocess::clean_response;
use crate::prompts::{extraction_instruction, response_schema};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sends documents to the model and parses what comes back.
#[derive(Clone)]
pub struct Extractor {
    backend: Arc<dyn InferenceBackend>,
    temperature: f32,
}

impl Extractor {
    pub fn new(backend: Arc<dyn InferenceBackend>, temperature: f32) -> Self {
        Self {
            backend,
            temperature,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Extract the line items for one document.
    ///
    /// `display_name` is the filename without extension. It is both written
    /// into the instruction and forced onto every returned item.
    pub async fn extract(
        &self,
        payload: Payload,
        display_name: &str,
    ) -> Result<ExtractedData, ExtractionError> {
        let start = Instant::now();
        let request = InferenceRequest {
            payload,
            instruction: extraction_instruction(display_name),
            schema: response_schema(),
            temperature: self.temperature,
        };

        let text = self.backend.generate(&request).await?;
        let data = parse_response(&text, display_name)?;

        debug!(
            "{}: {} item(s) via {} in {:?}",
            display_name,
            data.items.len(),
            self.backend.name(),
            start.elapsed()
        );
        Ok(data)
    }
}

/// Parse and validate raw model text, then apply the name/remarks override.
pub fn parse_response(text: &str, display_name: &str) -> Result<ExtractedData, ExtractionError> {
    let cleaned = clean_response(text);
    if cleaned.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(&cleaned)?;
    if !value.is_object() {
        return Err(ExtractionError::SchemaMismatch(
            "top-level value must be an object".to_string(),
        ));
    }

    let mut data: ExtractedData = serde_json::from_value(value)
        .map_err(|e| ExtractionError::SchemaMismatch(e.to_string()))?;

    for (i, item) in data.items.iter().enumerate() {
        item.validate()
            .map_err(|reason| ExtractionError::SchemaMismatch(format!("item {}: {}", i, reason)))?;
    }

    for item in &mut data.items {
        item.name = display_name.to_string();
        item.remarks.clear();
    }

    Ok(data)
}
