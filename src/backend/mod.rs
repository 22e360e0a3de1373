//! Inference backends: one request in, raw response text out.
//!
//! The extraction client never talks HTTP itself. It hands an
//! [`InferenceRequest`] (payload + instruction + schema) to an
//! [`InferenceBackend`] and parses whatever text comes back. Two backends
//! ship with the crate:
//!
//! * [`gemini::GeminiBackend`] — Gemini `generateContent` over REST with a
//!   native `responseSchema` and JSON output mode. This is the default.
//! * [`provider::ProviderBackend`] — any edgequake-llm vision provider. The
//!   schema is appended to the instruction since those APIs have no common
//!   structured-output parameter.

pub mod gemini;
pub mod provider;

use crate::config::{BackendKind, ExtractorConfig, DEFAULT_API_KEY_ENV, FALLBACK_API_KEY_ENV};
use crate::error::{ExtractionError, InvoiceError};
use crate::pipeline::encode::Payload;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Everything a backend needs for one document.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub payload: Payload,
    pub instruction: String,
    /// Structured-output schema, Gemini `responseSchema` dialect.
    pub schema: Value,
    pub temperature: f32,
}

/// One call to an external multimodal model. No retries, no caching.
pub trait InferenceBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Send the request and return the model's raw text answer.
    fn generate<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> BoxFuture<'a, Result<String, ExtractionError>>;
}

/// Pick the backend for a config, from most-specific to least-specific:
/// an injected backend, then the configured [`BackendKind`].
pub fn resolve_backend(config: &ExtractorConfig) -> Result<Arc<dyn InferenceBackend>, InvoiceError> {
    if let Some(ref backend) = config.inference {
        return Ok(Arc::clone(backend));
    }

    match config.backend {
        BackendKind::Gemini => Ok(Arc::new(gemini::GeminiBackend::new(config)?)),
        BackendKind::Provider => {
            let llm = provider::resolve_provider(config)?;
            Ok(Arc::new(provider::ProviderBackend::new(llm, config.max_tokens)))
        }
    }
}

/// Read the API key at call time.
///
/// The default variable falls back to `API_KEY`; a custom variable does not.
pub fn read_api_key(var: &str) -> Result<String, ExtractionError> {
    let lookup = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    let key = lookup(var).or_else(|| {
        if var == DEFAULT_API_KEY_ENV {
            lookup(FALLBACK_API_KEY_ENV)
        } else {
            None
        }
    });

    key.ok_or_else(|| ExtractionError::MissingCredentials {
        var: var.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_key_variable_has_no_fallback() {
        let err = read_api_key("INVOICE_EXTRACT_TEST_UNSET_KEY_7f3a").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("INVOICE_EXTRACT_TEST_UNSET_KEY_7f3a"));
    }

    #[test]
    fn injected_backend_wins() {
        struct Fixed;
        impl InferenceBackend for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn generate<'a>(
                &'a self,
                _request: &'a InferenceRequest,
            ) -> BoxFuture<'a, Result<String, ExtractionError>> {
                Box::pin(async { Ok("{}".to_string()) })
            }
        }

        let config = ExtractorConfig::builder()
            .inference(Arc::new(Fixed))
            .build()
            .unwrap();
        let backend = resolve_backend(&config).unwrap();
        assert_eq!(backend.name(), "fixed");
    }
}
