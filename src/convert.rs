//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one Markdown file and writes the
//! PDF (plus the intermediate HTML) next to it. The lower-level
//! [`convert_str_to_layout`] and [`render_layout_pdf`] expose the layout
//! backend's two halves for callers that want the element sequence or the
//! PDF bytes without touching the filesystem.

use crate::config::{Backend, ConversionConfig, PageGeometry};
use crate::error::Md2PdfError;
use crate::model::{ContentNode, LayoutDocument, NodeKind};
use crate::output::ConversionOutput;
use crate::pipeline::context::RunContext;
use crate::pipeline::diagrams::{self, DiagramRenderer, DiagramStats, MermaidCli};
use crate::pipeline::{browser, html, input, mapper, paginate, parse, pdf};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Title used when nothing better is available.
const UNTITLED: &str = "Document";

/// Convert a Markdown file to PDF.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_path` — Markdown file to convert
/// * `output_path` — PDF to write; defaults to the input path with a `.pdf`
///   extension
/// * `config` — Conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` once the PDF is written, even if some diagrams or
/// images degraded to placeholders (see `output.warnings`).
///
/// # Errors
/// Returns `Err(Md2PdfError)` only for fatal errors:
/// - Input not found / unreadable / not UTF-8
/// - Browser missing, failing or timing out (browser backend)
/// - Output not writable
pub async fn convert(
    input_path: impl AsRef<Path>,
    output_path: Option<&Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let renderer = MermaidCli::new(
        config.mermaid_cli.clone(),
        Duration::from_secs(config.diagram_timeout_secs),
    );
    convert_with_renderer(input_path, output_path, config, &renderer).await
}

/// [`convert`] with a caller-supplied diagram renderer.
pub async fn convert_with_renderer<R: DiagramRenderer>(
    input_path: impl AsRef<Path>,
    output_path: Option<&Path>,
    config: &ConversionConfig,
    renderer: &R,
) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_path.as_ref())?;
    info!("Starting conversion: {}", resolved.path.display());
    let pdf_path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input::default_output_path(&resolved.path));
    let html_path = input::html_path_for(&pdf_path);

    let mut ctx = RunContext::new(&resolved.base_dir, config.image_box)?;

    // ── Step 2: Diagrams ─────────────────────────────────────────────────
    let (markdown, diagrams) = render_diagrams(&resolved.markdown, config, renderer, &mut ctx).await;

    // ── Step 3: Render ───────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_render_start(config.backend);
    }
    let root = parse::parse_markdown(&markdown);

    let (pages, html_written) = match config.backend {
        Backend::Layout => {
            let doc = mapper::map_document(&root, &mut ctx);
            let title = resolve_title(config, doc.title.as_deref(), &resolved.path);

            let html_written = if config.write_html {
                let page = html::render_html(&markdown, &title, &resolved.base_dir);
                write_atomic(&html_path, page.as_bytes()).await?;
                Some(html_path)
            } else {
                None
            };

            // Diagram images are read from the run's temp dir here, so `ctx`
            // must outlive this call.
            let geometry = config.page_geometry();
            let (bytes, pages) = tokio::task::spawn_blocking(move || {
                render_layout_pdf(&doc, geometry, Some(title.as_str()))
            })
            .await
            .map_err(|e| Md2PdfError::Internal(format!("Layout task panicked: {e}")))??;

            write_atomic(&pdf_path, &bytes).await?;
            (Some(pages), html_written)
        }
        Backend::Browser => {
            let title = resolve_title(config, first_title(&root).as_deref(), &resolved.path);
            let page = html::render_html(&markdown, &title, &resolved.base_dir);
            write_atomic(&html_path, page.as_bytes()).await?;
            ensure_parent(&pdf_path).await?;

            browser::print_to_pdf(
                &config.browser,
                &html_path,
                &pdf_path,
                config.browser_timeout_secs,
            )
            .await?;
            (None, Some(html_path))
        }
    };

    let duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Wrote {} ({} backend) in {}ms",
        pdf_path.display(),
        config.backend,
        duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(pages);
    }

    Ok(ConversionOutput {
        pdf_path,
        html_path: html_written,
        backend: config.backend,
        pages,
        diagrams,
        warnings: ctx.into_warnings(),
        duration_ms,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_path: impl AsRef<Path>,
    output_path: Option<&Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_path, output_path, config))
}

/// Parse and map Markdown to layout elements without rendering anything.
///
/// Diagrams are not rendered; relative images resolve against `base_dir`.
pub fn convert_str_to_layout(
    markdown: &str,
    base_dir: &Path,
    config: &ConversionConfig,
) -> Result<LayoutDocument, Md2PdfError> {
    let mut ctx = RunContext::new(base_dir, config.image_box)?;
    let root = parse::parse_markdown(markdown);
    let mut doc = mapper::map_document(&root, &mut ctx);
    if let Some(ref title) = config.title {
        doc.title = Some(title.clone());
    }
    Ok(doc)
}

/// Paginate `doc` and serialise it to PDF bytes. Returns the bytes and the
/// page count.
pub fn render_layout_pdf(
    doc: &LayoutDocument,
    geometry: PageGeometry,
    title: Option<&str>,
) -> Result<(Vec<u8>, usize), Md2PdfError> {
    let pages = paginate::paginate(doc, geometry);
    debug!("Paginated {} elements onto {} pages", doc.elements.len(), pages.len());
    let bytes = pdf::write_pdf(&pages, geometry, title)?;
    Ok((bytes, pages.len()))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn render_diagrams<R: DiagramRenderer>(
    markdown: &str,
    config: &ConversionConfig,
    renderer: &R,
    ctx: &mut RunContext,
) -> (String, DiagramStats) {
    if !config.render_diagrams {
        debug!("Diagram rendering disabled");
        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_start(0);
        }
        return (markdown.to_string(), DiagramStats::default());
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(diagrams::find_diagrams(markdown).len());
    }
    diagrams::preprocess(markdown, renderer, ctx, config.progress_callback.as_ref()).await
}

/// Configured title, then the first level-1 heading, then the file stem.
fn resolve_title(config: &ConversionConfig, heading: Option<&str>, input: &Path) -> String {
    config
        .title
        .clone()
        .or_else(|| heading.map(str::to_string))
        .or_else(|| input::stem_title(input))
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Text of the first top-level `h1`.
fn first_title(root: &ContentNode) -> Option<String> {
    root.children
        .iter()
        .find(|n| n.kind == NodeKind::Heading(1) && !n.is_blank())
        .map(|n| n.text_content().split_whitespace().collect::<Vec<_>>().join(" "))
}

async fn ensure_parent(path: &Path) -> Result<(), Md2PdfError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Md2PdfError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        _ => Ok(()),
    }
}

/// Atomic write: write to a sibling temp file, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Md2PdfError> {
    ensure_parent(path).await?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| Md2PdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Md2PdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
