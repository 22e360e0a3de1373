//! Error types for the invoice-extract library.
//!
//! Two layers of failure, kept apart on purpose:
//!
//! * [`InvoiceError`] — **Fatal**: the batch cannot start or its output
//!   cannot be written (invalid configuration, empty selection, a batch is
//!   already running). Returned as `Err(InvoiceError)`.
//!
//! * [`FileError`] — **Non-fatal**: one file failed to normalise or extract.
//!   The batch records the filename and moves on; the error itself is only
//!   logged and kept in [`crate::output::FileFailure`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice-extract library.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The selection contained nothing that can be processed.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// A batch is already running on this controller.
    #[error("A batch is already running; wait for it to finish before starting or clearing another")]
    BatchBusy,

    /// The configured provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not create or write the TSV export.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Problems with the set of files handed to a batch.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Input not found: '{path}'")]
    NotFound { path: PathBuf },

    /// None of the selected files is a PDF or a supported image.
    #[error("Please upload PDF or image files (.pdf, .jpg, .jpeg, .png, .webp); {skipped} unsupported file(s) ignored")]
    NoSupportedFiles { skipped: usize },

    #[error("Failed to read directory '{path}': {detail}")]
    Walk { path: PathBuf, detail: String },
}

/// Failure turning a source file into an inference payload.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF could not be opened or its first page could not be rendered.
    #[error("Failed to process PDF file '{path}': {detail}")]
    PdfConversion { path: PathBuf, detail: String },

    #[error("Failed to encode rendered page as JPEG: {0}")]
    ImageEncode(#[from] image::ImageError),
}

/// Failure contacting the model or interpreting its answer.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No API key in the environment. Recurs for every file in the batch.
    #[error("API key not found: set {var}")]
    MissingCredentials { var: String },

    #[error("No response text from the model")]
    EmptyResponse,

    #[error("Model response is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Valid JSON, but not the shape or value ranges we asked for.
    #[error("Model response does not match the schema: {0}")]
    SchemaMismatch(String),

    #[error("Request to the inference endpoint failed: {0}")]
    Transport(String),

    #[error("Inference API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Error surfaced by a generic edgequake-llm provider.
    #[error("LLM provider error: {0}")]
    Provider(String),
}

impl ExtractionError {
    /// True for setup problems that will fail every file the same way.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ExtractionError::MissingCredentials { .. })
    }
}

/// A non-fatal error for a single file of a batch.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
