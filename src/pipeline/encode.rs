//! Image encoding: local image file → base64 `data:` URI.
//!
//! The browser backend inlines every local image so the intermediate HTML is
//! self-contained and prints the same from any working directory.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// MIME type for an image path, judged by its extension.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Read `path` and wrap its bytes in a base64 data URI.
pub fn data_uri(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let b64 = STANDARD.encode(&bytes);
    debug!("Inlined {} → {} bytes base64", path.display(), b64.len());
    Ok(format!("data:{};base64,{}", mime_for(path), b64))
}
