//! Configuration types for invoice extraction.
//!
//! Every knob lives in [`ExtractorConfig`], built through
//! [`ExtractorConfigBuilder`]. Collaborators (inference backend, PDF
//! rasterizer, progress callback) can be injected here; when absent the
//! controller constructs the defaults from the remaining fields.

use crate::backend::InferenceBackend;
use crate::error::InvoiceError;
use crate::pipeline::render::PageRasterizer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variable holding the API key.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Checked when the configured key variable is unset.
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Gemini REST base URL.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which inference backend handles extraction requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Gemini `generateContent` with a native response schema. (default)
    #[default]
    Gemini,
    /// Any edgequake-llm vision provider; the schema travels in the prompt.
    Provider,
}

/// Configuration for a batch extraction.
///
/// # Example
/// ```rust
/// use invoice_extract::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .model("gemini-2.5-flash")
///     .render_scale(2.0)
///     .jpeg_quality(80)
///     .build()
///     .unwrap();
/// assert_eq!(config.temperature, 0.1);
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Model identifier. Default: `gemini-2.5-flash`.
    pub model: String,

    /// Backend used when no pre-built backend is injected.
    pub backend: BackendKind,

    /// edgequake-llm provider name for [`BackendKind::Provider`] (e.g. "openai").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed edgequake-llm provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed inference backend. Takes precedence over everything above.
    pub inference: Option<Arc<dyn InferenceBackend>>,

    /// Pre-constructed PDF rasterizer. Default: pdfium.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Output token cap for the generic provider backend. Default: 1024.
    pub max_tokens: usize,

    /// PDF render scale relative to the native page size. Default: 2.0.
    pub render_scale: f32,

    /// JPEG quality for rendered PDF pages, 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Environment variable read for the API key on every call.
    /// Default: `GEMINI_API_KEY`, falling back to `API_KEY`.
    pub api_key_env: String,

    /// Gemini REST base URL.
    pub endpoint: String,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Directory containing the pdfium shared library.
    /// If None, the working directory and then the system library path are tried.
    pub pdfium_lib_path: Option<PathBuf>,

    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            backend: BackendKind::default(),
            provider_name: None,
            provider: None,
            inference: None,
            rasterizer: None,
            temperature: 0.1,
            max_tokens: 1024,
            render_scale: 2.0,
            jpeg_quality: 80,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_timeout_secs: 60,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("model", &self.model)
            .field("backend", &self.backend)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("inference", &self.inference.as_ref().map(|_| "<dyn InferenceBackend>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("render_scale", &self.render_scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("api_key_env", &self.api_key_env)
            .field("endpoint", &self.endpoint)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl ExtractorConfig {
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractorConfig`].
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl fmt::Debug for ExtractorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractorConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn inference(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.config.inference = Some(backend);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.api_key_env = var.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, InvoiceError> {
        let c = &self.config;
        if !c.render_scale.is_finite() || !(0.5..=8.0).contains(&c.render_scale) {
            return Err(InvoiceError::InvalidConfig(format!(
                "Render scale must be 0.5–8.0, got {}",
                c.render_scale
            )));
        }
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(InvoiceError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.model.trim().is_empty() {
            return Err(InvoiceError::InvalidConfig("Model must not be empty".into()));
        }
        if c.api_key_env.trim().is_empty() {
            return Err(InvoiceError::InvalidConfig(
                "API key variable name must not be empty".into(),
            ));
        }
        if !(c.endpoint.starts_with("https://") || c.endpoint.starts_with("http://")) {
            return Err(InvoiceError::InvalidConfig(format!(
                "Endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_extraction_policy() {
        let c = ExtractorConfig::default();
        assert_eq!(c.model, "gemini-2.5-flash");
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.render_scale, 2.0);
        assert_eq!(c.jpeg_quality, 80);
        assert_eq!(c.api_key_env, "GEMINI_API_KEY");
        assert_eq!(c.backend, BackendKind::Gemini);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ExtractorConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn rejects_zero_quality() {
        let err = ExtractorConfig::builder().jpeg_quality(0).build().unwrap_err();
        assert!(err.to_string().contains("JPEG quality"));
    }

    #[test]
    fn rejects_out_of_range_scale() {
        assert!(ExtractorConfig::builder().render_scale(0.1).build().is_err());
        assert!(ExtractorConfig::builder().render_scale(f32::NAN).build().is_err());
    }

    #[test]
    fn rejects_non_http_endpoint() {
        assert!(ExtractorConfig::builder().endpoint("ftp://x").build().is_err());
    }
}
