//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline renders each diagram and prints the document.
//!
//! # Example
//!
//! ```rust
//! use md2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_diagram_complete(&self, index: usize, total: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Diagram {}/{} rendered", index, total);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     rendered: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::config::Backend;
use std::sync::Arc;

/// Called by the conversion pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in document order from a single task.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the input is read, before any diagram is rendered.
    ///
    /// # Arguments
    /// * `total_diagrams` — number of fenced diagram blocks found
    fn on_conversion_start(&self, total_diagrams: usize) {
        let _ = total_diagrams;
    }

    /// Called just before the diagram renderer is invoked.
    ///
    /// # Arguments
    /// * `index` — 1-based diagram number
    /// * `total` — total diagram blocks in the document
    fn on_diagram_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a diagram was rasterised and substituted.
    fn on_diagram_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a diagram degraded to a placeholder.
    ///
    /// # Arguments
    /// * `error` — human-readable failure description
    fn on_diagram_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called before the PDF backend starts producing output.
    fn on_render_start(&self, backend: Backend) {
        let _ = backend;
    }

    /// Called once after the PDF was written.
    ///
    /// # Arguments
    /// * `pages` — page count when known (layout backend), `None` otherwise
    fn on_conversion_complete(&self, pages: Option<usize>) {
        let _ = pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
