//! Pipeline stages for turning one invoice file into line items.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ extract ──▶ items
//! (select)  (render+encode) (model + postprocess)
//! ```
//!
//! 1. [`input`]     — walk the user's paths, keep PDFs and images, order them
//! 2. [`render`]    — rasterise page 1 of a PDF via pdfium; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]    — base64-wrap image bytes or a rendered page as JPEG
//! 4. [`normalize`] — drive 2 and 3 for one file and yield a [`encode::Payload`]
//! 5. [`extract`]   — send the payload to the inference backend, clean the
//!    answer with [`postprocess`], validate it and force per-file names

pub mod encode;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod postprocess;
pub mod render;
