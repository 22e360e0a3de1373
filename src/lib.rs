//! # invoice-extract
//!
//! Turn a pile of invoices and receipts (PDFs and photos) into a single
//! expense list using a multimodal model.
//!
//! Each file becomes one line item: the model reads the document and
//! reports a category, quantity, unit price and total. The item's name is
//! always the filename without its extension, so every row can be traced
//! back to its source document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files / directories
//!  │
//!  ├─ 1. Select     keep PDF, JPEG, PNG, WebP; sort by filename
//!  ├─ 2. Normalise  images as-is, PDFs → page 1 rendered to JPEG (pdfium)
//!  ├─ 3. Extract    Gemini (native JSON schema) or any edgequake-llm provider
//!  ├─ 4. Validate   strict JSON + range checks, name/remarks forced
//!  └─ 5. Collect    items appended per file; failures summarised by name
//! ```
//!
//! Files are processed strictly one after another. A failing file never
//! aborts the batch; it is named in the error summary instead.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice_extract::{export, BatchController, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY (or API_KEY) on every request
//!     let config = ExtractorConfig::default();
//!     let controller = BatchController::new(&config)?;
//!
//!     let report = controller.run_paths(&["receipts/"]).await?;
//!     let state = controller.snapshot();
//!     print!("{}", export::to_tsv(&state.items));
//!     if let Some(err) = report.error {
//!         eprintln!("{err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice-extract` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! invoice-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{InferenceBackend, InferenceRequest};
pub use batch::BatchController;
pub use config::{BackendKind, ExtractorConfig, ExtractorConfigBuilder};
pub use error::{ExtractionError, FileError, InvoiceError, NormalizeError, SelectionError};
pub use output::{
    BatchPhase, BatchProgress, BatchReport, BatchState, Category, ExtractedData, FileFailure,
    InvoiceItem,
};
pub use pipeline::encode::Payload;
pub use pipeline::input::{collect_inputs, MediaType, SourceFile};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
