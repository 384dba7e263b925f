//! # md2pdf
//!
//! Convert Markdown documents, including fenced Mermaid diagrams, tables,
//! code blocks and images, to styled PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Input     read the file, derive <name>.pdf / <name>.html
//!  ├─ 2. Diagrams  ```mermaid blocks → PNG via mmdc (placeholders on failure)
//!  ├─ 3. Parse     pulldown-cmark events → ContentNode tree
//!  ├─ 4. Map       tree → LayoutElements + StyleSheet
//!  ├─ 5. Render    layout: paginate + lopdf   │   browser: HTML + headless Chromium
//!  └─ 6. Output    PDF path, page count, diagram stats, warnings
//! ```
//!
//! Two backends produce the PDF. [`Backend::Layout`] (default) paginates the
//! layout elements itself and needs no external program. [`Backend::Browser`]
//! prints a self-contained HTML document with a headless Chromium.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("README.md", None, &config).await?;
//!     println!("wrote {}", output.pdf_path.display());
//!     for warning in &output.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Backend, ConversionConfig, ConversionConfigBuilder, PageGeometry, PaperSize};
pub use convert::{
    convert, convert_str_to_layout, convert_sync, convert_with_renderer, render_layout_pdf,
};
pub use error::{Md2PdfError, NodeError};
pub use model::{ContentNode, LayoutDocument, LayoutElement, NodeKind, StyleSheet};
pub use output::ConversionOutput;
pub use pipeline::diagrams::{DiagramRenderer, DiagramStats, MermaidCli};
pub use pipeline::image::{ImageBox, ImageProber, Probe};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
