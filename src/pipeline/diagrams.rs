//! Diagram preprocessing: rasterise fenced `mermaid` blocks before parsing.
//!
//! Each block is written to `diagram_<k>.mmd` in the run's temp directory and
//! handed to a [`DiagramRenderer`]. On success the block is replaced by an
//! image reference to the PNG; on failure by an italic placeholder naming the
//! diagram's 1-based position. A failure never stops the remaining diagrams.
//!
//! Blocks are located with the CommonMark parser, so tilde fences and fences
//! nested in list items or blockquotes are found too. Replacement matches
//! the original block text, which starts at the opening fence character:
//! the fence's indentation is left in place and the substitute stays inside
//! its container. Substitutions made for earlier diagrams cannot shift the
//! match position of later ones.

use crate::error::NodeError;
use crate::pipeline::context::RunContext;
use crate::pipeline::parse::{fence_language, parser_options};
use crate::progress::ProgressCallback;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Canvas the renderer draws on, in pixels.
pub const CANVAS_WIDTH: u32 = 2000;
pub const CANVAS_HEIGHT: u32 = 1080;

/// Fence language that marks a diagram block.
const DIAGRAM_LANGUAGE: &str = "mermaid";

/// A fenced diagram block found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// 1-based position among diagram blocks.
    pub index: usize,
    /// Exact source text of the whole fenced block, fences included.
    pub original: String,
    /// Diagram source between the fences.
    pub source: String,
}

/// Find every fenced `mermaid` block, in document order.
pub fn find_diagrams(markdown: &str) -> Vec<DiagramBlock> {
    let mut blocks = Vec::new();
    // Byte range of the open diagram block and the source collected so far.
    let mut open: Option<(usize, usize, String)> = None;

    for (event, range) in Parser::new_ext(markdown, parser_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                if fence_language(&info) == Some(DIAGRAM_LANGUAGE) =>
            {
                open = Some((range.start, range.end, String::new()));
            }
            Event::Text(text) => {
                if let Some((_, _, source)) = open.as_mut() {
                    source.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((start, end, source)) = open.take() {
                    // An unclosed fence runs to the end of its container,
                    // line terminator included.
                    let original = markdown[start..end].trim_end_matches(['\r', '\n']);
                    blocks.push(DiagramBlock {
                        index: blocks.len() + 1,
                        original: original.to_string(),
                        source: source.replace("\r\n", "\n"),
                    });
                }
            }
            _ => {}
        }
    }
    blocks
}

/// Replace the first occurrence of `original` at or after `from`.
///
/// Returns the offset just past the inserted text.
fn replace_from(text: &mut String, from: usize, original: &str, replacement: &str) -> usize {
    match text.get(from..).and_then(|rest| rest.find(original)) {
        Some(pos) => {
            let start = from + pos;
            text.replace_range(start..start + original.len(), replacement);
            start + replacement.len()
        }
        None => from,
    }
}

/// Why a single diagram could not be rendered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiagramFailure {
    #[error("{0}")]
    Failed(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Renders one diagram source file to a raster image.
pub trait DiagramRenderer: Send + Sync {
    fn render(
        &self,
        source: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), DiagramFailure>> + Send;
}

/// [`DiagramRenderer`] invoking the Mermaid CLI (`mmdc`).
#[derive(Debug, Clone)]
pub struct MermaidCli {
    program: String,
    timeout: Duration,
}

impl MermaidCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl DiagramRenderer for MermaidCli {
    async fn render(&self, source: &Path, output: &Path) -> Result<(), DiagramFailure> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(source)
            .arg("-o")
            .arg(output)
            .args(["-t", "default", "-b", "white"])
            .arg("-w")
            .arg(CANVAS_WIDTH.to_string())
            .arg("-H")
            .arg(CANVAS_HEIGHT.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let out = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => return Err(DiagramFailure::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) => {
                return Err(DiagramFailure::Failed(format!(
                    "could not start '{}': {}",
                    self.program, e
                )))
            }
            Ok(Ok(out)) => out,
        };

        if out.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&out.stderr);
            Err(DiagramFailure::Failed(format!(
                "{}: {}",
                out.status,
                stderr.trim()
            )))
        }
    }
}

/// Counts reported by [`preprocess`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiagramStats {
    pub found: usize,
    pub rendered: usize,
    pub failed: usize,
}

/// Image reference substituted for a rendered diagram.
pub fn image_reference(index: usize, image: &Path) -> String {
    format!("![Mermaid Diagram {}](<{}>)", index, image.display())
}

/// Placeholder substituted for a diagram that failed to render.
pub fn failure_placeholder(index: usize) -> String {
    format!("*[Mermaid diagram {index} - rendering failed]*")
}

/// Replace every fenced diagram in `markdown` with an image or a placeholder.
///
/// Diagrams are rendered one at a time in document order. Generated images
/// are recorded in `ctx`; failures are recorded as warnings.
pub async fn preprocess<R: DiagramRenderer>(
    markdown: &str,
    renderer: &R,
    ctx: &mut RunContext,
    progress: Option<&ProgressCallback>,
) -> (String, DiagramStats) {
    let blocks = find_diagrams(markdown);
    let total = blocks.len();
    let mut stats = DiagramStats {
        found: total,
        ..DiagramStats::default()
    };
    if total == 0 {
        return (markdown.to_string(), stats);
    }
    info!("Rendering {} Mermaid diagram(s)", total);

    let mut text = markdown.to_string();
    let mut cursor = 0;
    for block in &blocks {
        if let Some(cb) = progress {
            cb.on_diagram_start(block.index, total);
        }

        let replacement = match render_block(block, renderer, ctx).await {
            Ok(image) => {
                debug!("Diagram {} → {}", block.index, image.display());
                let reference = image_reference(block.index, &image);
                stats.rendered += 1;
                if let Some(cb) = progress {
                    cb.on_diagram_complete(block.index, total);
                }
                reference
            }
            Err(failure) => {
                let error = match failure {
                    DiagramFailure::Timeout(secs) => NodeError::DiagramTimeout {
                        index: block.index,
                        secs,
                    },
                    DiagramFailure::Failed(detail) => NodeError::DiagramFailed {
                        index: block.index,
                        detail,
                    },
                };
                if let Some(cb) = progress {
                    cb.on_diagram_error(block.index, total, &error.to_string());
                }
                ctx.warn(error);
                stats.failed += 1;
                failure_placeholder(block.index)
            }
        };

        cursor = replace_from(&mut text, cursor, &block.original, &replacement);
    }

    (text, stats)
}

async fn render_block<R: DiagramRenderer>(
    block: &DiagramBlock,
    renderer: &R,
    ctx: &RunContext,
) -> Result<std::path::PathBuf, DiagramFailure> {
    let source = ctx.temp_path().join(format!("diagram_{}.mmd", block.index));
    let image = ctx.temp_path().join(format!("diagram_{}.png", block.index));

    tokio::fs::write(&source, &block.source)
        .await
        .map_err(|e| DiagramFailure::Failed(format!("cannot write diagram source: {e}")))?;

    renderer.render(&source, &image).await?;

    if !image.is_file() {
        return Err(DiagramFailure::Failed(
            "renderer reported success but produced no image".into(),
        ));
    }
    Ok(image)
}
