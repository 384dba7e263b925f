//! Headless-browser print of the intermediate HTML to PDF.
//!
//! One configured Chromium-compatible binary is started per run. Every
//! failure here is fatal: there is no second engine to fall back to inside
//! this backend.

use crate::error::Md2PdfError;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Milliseconds of virtual time the page gets to settle before printing.
const VIRTUAL_TIME_BUDGET_MS: u32 = 10_000;

/// Bytes escaped in a `file://` URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Command-line arguments for printing `html` to `output`.
pub fn print_args(html: &Path, output: &Path) -> Vec<String> {
    vec![
        "--headless".into(),
        "--disable-gpu".into(),
        "--no-sandbox".into(),
        "--disable-dev-shm-usage".into(),
        format!("--print-to-pdf={}", output.display()),
        "--no-pdf-header-footer".into(),
        "--print-to-pdf-no-header".into(),
        "--run-all-compositor-stages-before-draw".into(),
        format!("--virtual-time-budget={VIRTUAL_TIME_BUDGET_MS}"),
        "--allow-file-access-from-files".into(),
        file_url(html),
    ]
}

fn file_url(path: &Path) -> String {
    let abs: PathBuf = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let abs = abs.to_string_lossy().replace('\\', "/");
    let encoded = abs
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    if encoded.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    }
}

/// Print `html` to `output` with `browser`, bounded by `timeout_secs`.
pub async fn print_to_pdf(
    browser: &str,
    html: &Path,
    output: &Path,
    timeout_secs: u64,
) -> Result<(), Md2PdfError> {
    let args = print_args(html, output);
    debug!("Running {} {}", browser, args.join(" "));
    info!("Printing {} with {}", html.display(), browser);

    // A PDF left by an earlier run must not pass for this run's output.
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!("Removed stale {}", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Md2PdfError::OutputWriteFailed {
                path: output.to_path_buf(),
                source: e,
            })
        }
    }

    let mut cmd = Command::new(browser);
    cmd.args(&args).stdin(Stdio::null()).kill_on_drop(true);

    let out = match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
        Err(_) => {
            return Err(Md2PdfError::RendererTimeout {
                renderer: browser.to_string(),
                secs: timeout_secs,
            })
        }
        Ok(Err(e)) => {
            return Err(Md2PdfError::RendererUnavailable {
                renderer: browser.to_string(),
                detail: e.to_string(),
            })
        }
        Ok(Ok(out)) => out,
    };

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(Md2PdfError::RendererFailed {
            renderer: browser.to_string(),
            detail: format!("{}: {}", out.status, stderr.trim()),
        });
    }

    if !output.is_file() {
        return Err(Md2PdfError::RendererFailed {
            renderer: browser.to_string(),
            detail: format!("exited successfully but wrote no '{}'", output.display()),
        });
    }
    Ok(())
}
