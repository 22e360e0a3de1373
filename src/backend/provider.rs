//! Generic vision-provider backend built on edgequake-llm.
//!
//! Lets the same extraction run against OpenAI, Anthropic, Ollama and the
//! other providers edgequake-llm supports. These chat APIs have no shared
//! structured-output parameter, so the schema is appended to the
//! instruction and the answer is validated like any other response.

use super::{InferenceBackend, InferenceRequest};
use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, InvoiceError};
use crate::prompts::schema_suffix;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// [`InferenceBackend`] wrapping any edgequake-llm provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    max_tokens: usize,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    async fn call(&self, request: &InferenceRequest) -> Result<String, ExtractionError> {
        let prompt = format!("{}{}", request.instruction, schema_suffix(&request.schema));
        let image = ImageData::new(request.payload.data.clone(), request.payload.mime_type());
        let messages = vec![ChatMessage::user_with_images(&prompt, vec![image])];

        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractionError::Provider(format!("{}", e)))?;

        debug!(
            "provider: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

impl InferenceBackend for ProviderBackend {
    fn name(&self) -> &str {
        "provider"
    }

    fn generate<'a>(
        &'a self,
        request: &'a InferenceRequest,
    ) -> BoxFuture<'a, Result<String, ExtractionError>> {
        Box::pin(self.call(request))
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, InvoiceError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        InvoiceError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the edgequake-llm provider, from most-specific to least-specific:
///
/// 1. a pre-built provider on the config;
/// 2. `provider_name` + `model`;
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set;
/// 4. `ProviderFactory::from_env`, which picks the first provider whose API
///    key is present.
pub fn resolve_provider(config: &ExtractorConfig) -> Result<Arc<dyn LLMProvider>, InvoiceError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| InvoiceError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
