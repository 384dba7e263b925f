//! Result types returned by the conversion entry points.

use crate::config::Backend;
use crate::error::NodeError;
use crate::pipeline::diagrams::DiagramStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a finished conversion produced.
///
/// A run that returns `Ok` always wrote `pdf_path`; diagrams or images that
/// degraded to placeholders are listed in `warnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub pdf_path: PathBuf,
    /// Intermediate HTML, when it was written.
    pub html_path: Option<PathBuf>,
    pub backend: Backend,
    /// Page count; only known for [`Backend::Layout`].
    pub pages: Option<usize>,
    pub diagrams: DiagramStats,
    pub warnings: Vec<NodeError>,
    pub duration_ms: u64,
}

impl ConversionOutput {
    /// True when nothing degraded to a placeholder.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_warnings() {
        let output = ConversionOutput {
            pdf_path: PathBuf::from("README.pdf"),
            html_path: None,
            backend: Backend::Layout,
            pages: Some(2),
            diagrams: DiagramStats {
                found: 1,
                rendered: 0,
                failed: 1,
            },
            warnings: vec![NodeError::DiagramTimeout { index: 1, secs: 60 }],
            duration_ms: 12,
        };
        assert!(!output.is_clean());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["backend"], "Layout");
        assert_eq!(json["diagrams"]["failed"], 1);
        assert_eq!(json["warnings"][0]["DiagramTimeout"]["secs"], 60);
    }
}
