//! Batch orchestration: sorted, strictly sequential normalise → extract.
//!
//! [`BatchController`] owns the only mutable state of a session (the
//! accumulated items, the current progress and the error summary) and
//! publishes it through a [`tokio::sync::watch`] channel. Every transition
//! goes through the sender, so subscribers see items appear file by file
//! rather than only at the end.
//!
//! ```text
//! Idle ──run──▶ Running ──(all files attempted)──▶ Idle [+ error summary]
//!   ▲                │
//!   └──── reset ─────┘ (rejected with BatchBusy while Running)
//! ```
//!
//! Per-file failures never abort the batch: they are logged with their
//! full error and folded into one user-facing summary naming the files.

use crate::backend::resolve_backend;
use crate::config::ExtractorConfig;
use crate::error::{FileError, InvoiceError, SelectionError};
use crate::output::{
    BatchPhase, BatchProgress, BatchReport, BatchState, ExtractedData, FileFailure,
};
use crate::pipeline::extract::Extractor;
use crate::pipeline::input::{collect_inputs, sort_for_processing, SourceFile};
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::progress::ProgressCallback;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Summary shown when a non-empty selection produced no items at all.
pub const NOTHING_EXTRACTED: &str = "No items could be extracted from the uploaded files.";

/// Runs batches and holds the session state between them.
pub struct BatchController {
    normalizer: Normalizer,
    extractor: Extractor,
    state: watch::Sender<BatchState>,
    progress: Option<ProgressCallback>,
}

impl BatchController {
    /// Build a controller from a validated config.
    ///
    /// Resolves the inference backend up front, so provider misconfiguration
    /// surfaces here. A missing API key does not: it is read per request.
    pub fn new(config: &ExtractorConfig) -> Result<Self, InvoiceError> {
        let backend = resolve_backend(config)?;
        let rasterizer: Arc<dyn PageRasterizer> = match config.rasterizer {
            Some(ref r) => Arc::clone(r),
            None => Arc::new(PdfiumRasterizer::new(config.pdfium_lib_path.clone())),
        };

        let (state, _) = watch::channel(BatchState::default());
        Ok(Self {
            normalizer: Normalizer::new(rasterizer, config.render_scale, config.jpeg_quality),
            extractor: Extractor::new(backend, config.temperature),
            state,
            progress: config.progress_callback.clone(),
        })
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.state.subscribe()
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> BatchState {
        self.state.borrow().clone()
    }

    /// Clear accumulated items, error summary and title.
    ///
    /// Idempotent. Rejected while a batch is running.
    pub fn reset(&self) -> Result<(), InvoiceError> {
        let mut busy = false;
        self.state.send_if_modified(|s| {
            if s.is_running() {
                busy = true;
                return false;
            }
            let changed = !s.items.is_empty() || s.error.is_some() || s.title.is_some();
            s.items.clear();
            s.error = None;
            s.title = None;
            changed
        });
        if busy {
            return Err(InvoiceError::BatchBusy);
        }
        debug!("Batch state reset");
        Ok(())
    }

    /// Collect files from paths (walking directories), then [`run`](Self::run).
    pub async fn run_paths<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<BatchReport, InvoiceError> {
        let selection = collect_inputs(inputs)?;
        self.run(selection.files).await
    }

    /// Process `files` in filename order, appending items as each completes.
    ///
    /// Returns `Err` only when the batch cannot start: an empty selection or
    /// another batch already running. Everything else ends up in the report
    /// and in [`BatchState::error`].
    pub async fn run(&self, mut files: Vec<SourceFile>) -> Result<BatchReport, InvoiceError> {
        if files.is_empty() {
            return Err(SelectionError::NoSupportedFiles { skipped: 0 }.into());
        }
        sort_for_processing(&mut files);
        let total = files.len();

        let mut busy = false;
        self.state.send_if_modified(|s| {
            if s.is_running() {
                busy = true;
                return false;
            }
            s.phase = BatchPhase::Running;
            s.error = None;
            s.progress = None;
            true
        });
        if busy {
            return Err(InvoiceError::BatchBusy);
        }
        let mut guard = RunGuard {
            state: &self.state,
            armed: true,
        };

        let start = Instant::now();
        info!(
            "Starting batch: {} file(s) via {}",
            total,
            self.extractor.backend_name()
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        let mut failures = Vec::new();
        let mut items_added = 0usize;

        for (idx, file) in files.iter().enumerate() {
            let current = idx + 1;
            self.state.send_modify(|s| {
                s.progress = Some(BatchProgress {
                    current,
                    total,
                    filename: file.filename.clone(),
                });
            });
            if let Some(ref cb) = self.progress {
                cb.on_file_start(current, total, &file.filename);
            }

            match self.process_file(file).await {
                Ok(data) => {
                    let count = data.items.len();
                    items_added += count;
                    self.state.send_modify(|s| {
                        s.items.extend(data.items);
                        if !data.title.trim().is_empty() {
                            s.title = Some(data.title);
                        }
                    });
                    debug!("{}: {} item(s) appended", file.filename, count);
                    if let Some(ref cb) = self.progress {
                        cb.on_file_complete(current, total, &file.filename, count);
                    }
                }
                Err(e) => {
                    error!("Error processing {}: {}", file.filename, error_chain(&e));
                    let message = e.to_string();
                    if let Some(ref cb) = self.progress {
                        cb.on_file_error(current, total, &file.filename, &message);
                    }
                    failures.push(FileFailure {
                        filename: file.filename.clone(),
                        error: message,
                    });
                }
            }
        }

        let summary = summarize(&failures, items_added);
        guard.armed = false;
        self.state.send_modify(|s| {
            s.phase = BatchPhase::Idle;
            s.progress = None;
            s.error = summary.clone();
        });

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch finished: {} item(s) from {} file(s), {} failed, {}ms",
            items_added,
            total,
            failures.len(),
            duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, items_added, summary.as_deref());
        }

        Ok(BatchReport {
            files_total: total,
            items_added,
            failures,
            error: summary,
            duration_ms,
        })
    }

    async fn process_file(&self, file: &SourceFile) -> Result<ExtractedData, FileError> {
        let payload = self.normalizer.normalize(file).await?;
        let data = self
            .extractor
            .extract(payload, &file.display_name())
            .await?;
        Ok(data)
    }
}

/// Returns the state to Idle if a run future is dropped mid-batch.
struct RunGuard<'a> {
    state: &'a watch::Sender<BatchState>,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|s| {
                s.phase = BatchPhase::Idle;
                s.progress = None;
            });
        }
    }
}

/// The user-facing error summary for a finished batch, if any.
pub fn summarize(failures: &[FileFailure], items_added: usize) -> Option<String> {
    if !failures.is_empty() {
        let names: Vec<&str> = failures.iter().map(|f| f.filename.as_str()).collect();
        Some(format!(
            "Failed to process {} file(s): {}. Check logs for details.",
            failures.len(),
            names.join(", ")
        ))
    } else if items_added == 0 {
        Some(NOTHING_EXTRACTED.to_string())
    } else {
        None
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
