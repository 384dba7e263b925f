//! CLI binary for md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf::pipeline::input::resolve_input;
use md2pdf::{
    convert, convert_str_to_layout, Backend, ConversionConfig, ConversionProgressCallback,
    PaperSize, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Spinner with one log line per diagram.
struct CliProgressCallback {
    bar: ProgressBar,
    failed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading Markdown…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            failed: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_diagrams: usize) {
        if total_diagrams > 0 {
            self.bar.set_prefix("Diagrams");
            self.bar
                .set_message(format!("rendering {total_diagrams} Mermaid diagram(s)…"));
        }
    }

    fn on_diagram_start(&self, index: usize, total: usize) {
        self.bar.set_message(format!("diagram {index}/{total}"));
    }

    fn on_diagram_complete(&self, index: usize, total: usize) {
        self.bar
            .println(format!("  {} Diagram {:>2}/{:<2}", green("✓"), index, total));
    }

    fn on_diagram_error(&self, index: usize, total: usize, error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Diagram {:>2}/{:<2}  {}",
            red("✗"),
            index,
            total,
            red(&msg)
        ));
    }

    fn on_render_start(&self, backend: Backend) {
        self.bar.set_prefix("Rendering");
        self.bar.set_message(format!("{backend} backend…"));
    }

    fn on_conversion_complete(&self, pages: Option<usize>) {
        self.bar.finish_and_clear();
        let failed = self.failed.load(Ordering::SeqCst);
        let pages = pages.map(|p| format!("{p} pages")).unwrap_or_default();
        if failed == 0 {
            eprintln!("{} PDF written {}", green("✔"), dim(&pages));
        } else {
            eprintln!(
                "{} PDF written {}  ({} diagram(s) replaced by placeholders)",
                yellow("⚠"),
                dim(&pages),
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert README.md in the current directory to README.pdf
  md2pdf

  # Convert a file to a named PDF on A4 paper
  md2pdf docs/guide.md -o guide.pdf --paper a4

  # Print with a headless Chromium instead of the built-in layout
  md2pdf --backend browser --browser /usr/bin/google-chrome notes.md

  # Skip Mermaid rendering (diagrams stay as code blocks)
  md2pdf --no-diagrams design.md

  # Inspect the layout elements without rendering
  md2pdf --dump-layout README.md > layout.json

EXTERNAL TOOLS:
  mmdc       Mermaid CLI, for ```mermaid blocks   npm install -g @mermaid-js/mermaid-cli
  chromium   Only for --backend browser          any Chrome/Chromium build

ENVIRONMENT VARIABLES:
  MD2PDF_BROWSER      Browser executable for --backend browser
  MD2PDF_MERMAID_CLI  Mermaid CLI executable
  RUST_LOG            Log filter (overrides -v / -q)
"#;

/// Convert Markdown documents to styled PDF.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown (with Mermaid diagrams, tables, code and images) to PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    #[arg(default_value = "README.md")]
    input: PathBuf,

    /// PDF to write. Default: the input path with a .pdf extension.
    #[arg(short, long, env = "MD2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// PDF engine.
    #[arg(long, env = "MD2PDF_BACKEND", value_enum, default_value = "layout")]
    backend: BackendArg,

    /// Paper size (layout backend).
    #[arg(long, env = "MD2PDF_PAPER", value_enum, default_value = "letter")]
    paper: PaperArg,

    /// Page margin in points (layout backend).
    #[arg(long, env = "MD2PDF_MARGIN", default_value_t = 72.0)]
    margin: f32,

    /// Document title. Default: first level-1 heading, then the file name.
    #[arg(long, env = "MD2PDF_TITLE")]
    title: Option<String>,

    /// Mermaid CLI executable.
    #[arg(long, env = "MD2PDF_MERMAID_CLI", default_value = "mmdc")]
    mermaid_cli: String,

    /// Per-diagram render timeout in seconds.
    #[arg(long, env = "MD2PDF_DIAGRAM_TIMEOUT", default_value_t = 60)]
    diagram_timeout: u64,

    /// Headless browser executable (browser backend).
    #[arg(long, env = "MD2PDF_BROWSER", default_value = "chromium")]
    browser: String,

    /// Print-to-PDF timeout in seconds (browser backend).
    #[arg(long, env = "MD2PDF_BROWSER_TIMEOUT", default_value_t = 90)]
    browser_timeout: u64,

    /// Leave ```mermaid blocks as code instead of rendering them.
    #[arg(long)]
    no_diagrams: bool,

    /// Do not write the intermediate HTML next to the PDF (layout backend).
    #[arg(long)]
    no_html: bool,

    /// Print the layout elements as JSON and exit without rendering.
    #[arg(long)]
    dump_layout: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Layout,
    Browser,
}

impl From<BackendArg> for Backend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Layout => Backend::Layout,
            BackendArg::Browser => Backend::Browser,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    Letter,
    A4,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::Letter => PaperSize::Letter,
            PaperArg::A4 => PaperSize::A4,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", red("error:"), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would fight the spinner for the terminal, so they are
    // dropped while it runs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.dump_layout;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress && !cli.verbose {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Dump-layout mode ─────────────────────────────────────────────────
    if cli.dump_layout {
        let input = resolve_input(&cli.input)
            .with_context(|| format!("Failed to read {}", cli.input.display()))?;
        let doc = convert_str_to_layout(&input.markdown, &input.base_dir, &config)
            .context("Layout failed")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("Failed to serialise layout")?
        );
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, cli.output.as_deref(), &config)
        .await
        .context("Conversion failed")?;

    if !cli.quiet {
        for warning in &output.warnings {
            eprintln!("{} {}", yellow("warning:"), warning);
        }
        eprintln!(
            "{}  {}  {}ms  →  {}",
            if output.is_clean() { green("✔") } else { yellow("⚠") },
            output.backend,
            output.duration_ms,
            bold(&output.pdf_path.display().to_string()),
        );
        if let Some(ref html) = output.html_path {
            eprintln!("   {}", dim(&format!("html: {}", html.display())));
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .backend(cli.backend.into())
        .paper(cli.paper.into())
        .margin_pt(cli.margin)
        .mermaid_cli(cli.mermaid_cli.clone())
        .diagram_timeout_secs(cli.diagram_timeout)
        .browser(cli.browser.clone())
        .browser_timeout_secs(cli.browser_timeout)
        .render_diagrams(!cli.no_diagrams)
        .write_html(!cli.no_html);

    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
