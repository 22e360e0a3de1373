//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to receive
//! events as the batch works through its files. Callers that only need the
//! current state can poll [`crate::batch::BatchController::snapshot`] or
//! subscribe to it instead.
//!
//! # Example
//!
//! ```rust
//! use invoice_extract::{BatchProgressCallback, ExtractorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, current: usize, total: usize, filename: &str, items: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{current}/{total} {filename}: {items} item(s)");
//!     }
//! }
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch controller as it processes each file.
///
/// Files are processed one at a time, so calls never overlap for a single
/// batch. The trait is still `Send + Sync` because the controller may be
/// driven from any Tokio worker. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after sorting, before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when work on a file begins. `current` is 1-indexed.
    fn on_file_start(&self, current: usize, total: usize, filename: &str) {
        let _ = (current, total, filename);
    }

    /// Called when a file's items have been appended.
    fn on_file_complete(&self, current: usize, total: usize, filename: &str, items: usize) {
        let _ = (current, total, filename, items);
    }

    /// Called when a file failed; the batch continues.
    fn on_file_error(&self, current: usize, total: usize, filename: &str, error: &str) {
        let _ = (current, total, filename, error);
    }

    /// Called once after every file has been attempted.
    ///
    /// `error` is the user-facing summary, if the batch produced one.
    fn on_batch_complete(&self, total_files: usize, items_added: usize, error: Option<&str>) {
        let _ = (total_files, items_added, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
