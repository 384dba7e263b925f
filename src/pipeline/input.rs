//! Input resolution: validate the Markdown path and derive output paths.
//!
//! The input is read eagerly so the rest of the pipeline works on an owned
//! string; images and diagrams are then resolved against the file's parent
//! directory.

use crate::error::Md2PdfError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A Markdown file that has been found, read and decoded.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub markdown: String,
    /// Directory relative image paths are resolved against.
    pub base_dir: PathBuf,
}

/// Read the Markdown file at `path`.
///
/// Fails with [`Md2PdfError::FileNotFound`], [`Md2PdfError::PermissionDenied`]
/// or [`Md2PdfError::NotUtf8`] before any other work happens.
pub fn resolve_input(path: &Path) -> Result<ResolvedInput, Md2PdfError> {
    if !path.is_file() {
        return Err(Md2PdfError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Md2PdfError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Md2PdfError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut markdown = String::from_utf8(bytes).map_err(|_| Md2PdfError::NotUtf8 {
        path: path.to_path_buf(),
    })?;
    if markdown.starts_with('\u{feff}') {
        markdown.drain(..'\u{feff}'.len_utf8());
    }

    let base_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    debug!(
        "Resolved input {} ({} bytes, base dir {})",
        path.display(),
        markdown.len(),
        base_dir.display()
    );
    Ok(ResolvedInput {
        path: path.to_path_buf(),
        markdown,
        base_dir,
    })
}

/// `<input stem>.pdf` beside the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

/// `<output stem>.html` beside the output PDF.
pub fn html_path_for(output: &Path) -> PathBuf {
    output.with_extension("html")
}

/// Title of last resort: the input file stem.
pub fn stem_title(input: &Path) -> Option<String> {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
