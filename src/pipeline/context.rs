//! Per-run state shared by the preprocessing and mapping stages.
//!
//! One [`RunContext`] is created per conversion and dropped at its end; the
//! temporary directory holding rendered diagrams is deleted with it.

use crate::error::{Md2PdfError, NodeError};
use crate::pipeline::image::ImageBox;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::warn;

pub struct RunContext {
    temp_dir: TempDir,
    base_dir: PathBuf,
    image_box: ImageBox,
    warnings: Vec<NodeError>,
}

impl RunContext {
    /// Create a context resolving relative image paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, image_box: ImageBox) -> Result<Self, Md2PdfError> {
        let temp_dir = tempfile::Builder::new()
            .prefix("md2pdf-")
            .tempdir()
            .map_err(|e| Md2PdfError::Internal(format!("tempdir: {e}")))?;
        Ok(Self {
            temp_dir,
            base_dir: base_dir.into(),
            image_box,
            warnings: Vec::new(),
        })
    }

    /// Directory for files generated during this run.
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn image_box(&self) -> &ImageBox {
        &self.image_box
    }

    /// Record a node-level failure. The run continues.
    pub fn warn(&mut self, error: NodeError) {
        warn!("{}", error);
        self.warnings.push(error);
    }

    pub fn warnings(&self) -> &[NodeError] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<NodeError> {
        self.warnings
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("temp_dir", &self.temp_dir.path())
            .field("base_dir", &self.base_dir)
            .field("warnings", &self.warnings.len())
            .finish()
    }
}
