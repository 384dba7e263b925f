//! Error types for the md2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] — **Fatal**: the run cannot proceed at all (missing
//!   input file, no PDF engine available, output not writable). Returned as
//!   `Err(Md2PdfError)` from the top-level `convert*` functions.
//!
//! * [`NodeError`] — **Non-fatal**: a single diagram or image could not be
//!   resolved. The node degrades to a placeholder and the failure is kept in
//!   [`crate::output::ConversionOutput::warnings`] so callers can report it
//!   after the run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2pdf library.
///
/// Node-level failures use [`NodeError`] and never abort a run.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file '{path}' not found\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but is not valid UTF-8 text.
    #[error("Input file '{path}' is not valid UTF-8 Markdown")]
    NotUtf8 { path: PathBuf },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// The PDF engine binary could not be started.
    #[error(
        "PDF renderer '{renderer}' is not available: {detail}\n\n\
Install Chrome or Chromium, or switch to the built-in layout engine:\n\
  • macOS:  brew install --cask google-chrome   (or: brew install chromium)\n\
  • Ubuntu: sudo apt-get install chromium-browser\n\
  • Point md2pdf at an existing binary with --browser /path/to/chrome\n\
  • Or run with --backend layout (no external engine needed)\n"
    )]
    RendererUnavailable { renderer: String, detail: String },

    /// The PDF engine ran but reported a failure.
    #[error("PDF renderer '{renderer}' failed: {detail}")]
    RendererFailed { renderer: String, detail: String },

    /// The PDF engine did not finish within the configured timeout.
    #[error("PDF renderer '{renderer}' timed out after {secs}s\nIncrease --browser-timeout.")]
    RendererTimeout { renderer: String, secs: u64 },

    /// The layout engine could not serialise the document.
    #[error("PDF layout failed: {0}")]
    LayoutFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file (PDF or HTML).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single diagram or image.
///
/// The affected node is replaced by a placeholder and the run continues.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum NodeError {
    /// The diagram renderer exited with a failure or could not be started.
    #[error("Mermaid diagram {index}: rendering failed: {detail}")]
    DiagramFailed { index: usize, detail: String },

    /// The diagram renderer did not finish in time.
    #[error("Mermaid diagram {index}: renderer timed out after {secs}s")]
    DiagramTimeout { index: usize, secs: u64 },

    /// An image file exists but could not be read.
    #[error("Image '{path}' could not be read: {detail}")]
    ImageUnreadable { path: PathBuf, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = Md2PdfError::FileNotFound {
            path: PathBuf::from("README.md"),
        };
        assert!(e.to_string().contains("README.md"), "got: {e}");
    }

    #[test]
    fn renderer_unavailable_has_guidance() {
        let e = Md2PdfError::RendererUnavailable {
            renderer: "chromium".into(),
            detail: "No such file or directory".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("chromium"));
        assert!(msg.contains("--backend layout"));
    }

    #[test]
    fn renderer_timeout_display() {
        let e = Md2PdfError::RendererTimeout {
            renderer: "chromium".into(),
            secs: 90,
        };
        assert!(e.to_string().contains("90s"));
    }

    #[test]
    fn diagram_failed_display() {
        let e = NodeError::DiagramFailed {
            index: 2,
            detail: "exit status 1".into(),
        };
        assert!(e.to_string().contains("diagram 2"));
        assert!(e.to_string().contains("exit status 1"));
    }

    #[test]
    fn image_unreadable_display() {
        let e = NodeError::ImageUnreadable {
            path: PathBuf::from("img/a.png"),
            detail: "permission denied".into(),
        };
        assert!(e.to_string().contains("img/a.png"));
    }
}
