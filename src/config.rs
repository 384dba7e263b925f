//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! run can be reproduced from its config alone.

use crate::error::Md2PdfError;
use crate::pipeline::image::ImageBox;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a Markdown-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2pdf::{Backend, ConversionConfig, PaperSize};
///
/// let config = ConversionConfig::builder()
///     .backend(Backend::Layout)
///     .paper(PaperSize::A4)
///     .margin_pt(54.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Which pipeline produces the PDF. Default: [`Backend::Layout`].
    pub backend: Backend,

    /// Page size used by the layout backend. Default: Letter.
    pub paper: PaperSize,

    /// Page margin on all four sides, in points. Default: 72 (one inch).
    pub margin_pt: f32,

    /// Maximum box images are scaled into. Default: 5.5in × 7in at 72 pt/in.
    pub image_box: ImageBox,

    /// Mermaid CLI executable. Default: `mmdc`.
    pub mermaid_cli: String,

    /// Per-diagram render timeout in seconds. Default: 60.
    pub diagram_timeout_secs: u64,

    /// Headless browser executable used by [`Backend::Browser`]. Default: `chromium`.
    pub browser: String,

    /// Browser print-to-PDF timeout in seconds. Default: 90.
    pub browser_timeout_secs: u64,

    /// Rasterise fenced `mermaid` blocks before parsing. Default: true.
    ///
    /// When false the blocks stay in the document as ordinary code blocks.
    pub render_diagrams: bool,

    /// Write the intermediate HTML next to the PDF. Default: true.
    ///
    /// The browser backend always writes it, since the browser prints from it.
    pub write_html: bool,

    /// Document title. If None, the first level-1 heading or the file stem is used.
    pub title: Option<String>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            paper: PaperSize::default(),
            margin_pt: 72.0,
            image_box: ImageBox::default(),
            mermaid_cli: "mmdc".to_string(),
            diagram_timeout_secs: 60,
            browser: "chromium".to_string(),
            browser_timeout_secs: 90,
            render_diagrams: true,
            write_html: true,
            title: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("backend", &self.backend)
            .field("paper", &self.paper)
            .field("margin_pt", &self.margin_pt)
            .field("image_box", &self.image_box)
            .field("mermaid_cli", &self.mermaid_cli)
            .field("diagram_timeout_secs", &self.diagram_timeout_secs)
            .field("browser", &self.browser)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("render_diagrams", &self.render_diagrams)
            .field("write_html", &self.write_html)
            .field("title", &self.title)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Page geometry derived from the paper size and margin.
    pub fn page_geometry(&self) -> PageGeometry {
        let (width, height) = self.paper.dimensions();
        PageGeometry {
            width,
            height,
            margin: self.margin_pt,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn paper(mut self, paper: PaperSize) -> Self {
        self.config.paper = paper;
        self
    }

    pub fn margin_pt(mut self, margin: f32) -> Self {
        self.config.margin_pt = margin;
        self
    }

    pub fn image_box(mut self, image_box: ImageBox) -> Self {
        self.config.image_box = image_box;
        self
    }

    pub fn mermaid_cli(mut self, path: impl Into<String>) -> Self {
        self.config.mermaid_cli = path.into();
        self
    }

    pub fn diagram_timeout_secs(mut self, secs: u64) -> Self {
        self.config.diagram_timeout_secs = secs;
        self
    }

    pub fn browser(mut self, path: impl Into<String>) -> Self {
        self.config.browser = path.into();
        self
    }

    pub fn browser_timeout_secs(mut self, secs: u64) -> Self {
        self.config.browser_timeout_secs = secs;
        self
    }

    pub fn render_diagrams(mut self, v: bool) -> Self {
        self.config.render_diagrams = v;
        self
    }

    pub fn write_html(mut self, v: bool) -> Self {
        self.config.write_html = v;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;
        let (width, height) = c.paper.dimensions();
        if c.margin_pt.is_nan() || c.margin_pt < 0.0 || c.margin_pt * 2.0 >= width.min(height) {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Margin must leave a positive content area, got {}pt on a {}x{}pt page",
                c.margin_pt, width, height
            )));
        }
        if c.diagram_timeout_secs == 0 || c.browser_timeout_secs == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.image_box.max_width <= 0.0 || c.image_box.max_height <= 0.0 {
            return Err(Md2PdfError::InvalidConfig(
                "Image box must have a positive width and height".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The pipeline that turns the document into PDF bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Built-in page-flow layout written with lopdf. Needs no external engine. (default)
    #[default]
    Layout,
    /// Self-contained HTML printed by a headless Chromium.
    Browser,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Layout => f.write_str("layout"),
            Backend::Browser => f.write_str("browser"),
        }
    }
}

/// Physical page size for the layout backend.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// US Letter, 8.5in × 11in. (default)
    #[default]
    Letter,
    /// ISO A4, 210mm × 297mm.
    A4,
    /// Custom width × height in points.
    Custom(f32, f32),
}

impl PaperSize {
    /// Width and height in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PaperSize::Letter => (612.0, 792.0),
            PaperSize::A4 => (595.28, 841.89),
            PaperSize::Custom(w, h) => (*w, *h),
        }
    }
}

/// Page size and margins in points, as handed to the page-flow builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// Width available to content between the left and right margins.
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Height available to content between the top and bottom margins.
    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = ConversionConfig::builder().build().unwrap();
        assert_eq!(config.backend, Backend::Layout);
        assert_eq!(config.mermaid_cli, "mmdc");
        assert!(config.render_diagrams);
    }

    #[test]
    fn oversized_margin_rejected() {
        let err = ConversionConfig::builder().margin_pt(400.0).build();
        assert!(matches!(err, Err(Md2PdfError::InvalidConfig(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ConversionConfig::builder().diagram_timeout_secs(0).build();
        assert!(matches!(err, Err(Md2PdfError::InvalidConfig(_))));
    }

    #[test]
    fn letter_geometry() {
        let geo = ConversionConfig::default().page_geometry();
        assert_eq!(geo.content_width(), 468.0);
        assert_eq!(geo.content_height(), 648.0);
    }
}
