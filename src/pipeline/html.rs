//! Self-contained HTML document for the browser backend.
//!
//! `pulldown-cmark` renders the body. Local images are rewritten to base64
//! data URIs on the way through so the file prints identically wherever it
//! is opened from. The stylesheet is embedded; there is no script.

use crate::pipeline::encode::data_uri;
use crate::pipeline::image::resolve_src;
use crate::pipeline::parse::parser_options;
use pulldown_cmark::{html, CowStr, Event, Parser, Tag};
use std::path::Path;
use tracing::{debug, warn};

const STYLESHEET: &str = r#"
@page { size: auto; margin: 1cm; }
body {
    margin: 0;
    color: #24292e;
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", "Noto Sans", Helvetica, Arial, sans-serif;
    font-size: 14px;
    line-height: 1.5;
}
.markdown-body { max-width: 980px; margin: 0 auto; padding: 16px; }
h1, h2 { padding-bottom: .3em; border-bottom: 1px solid #eaecef; }
h1, h2, h3, h4, h5, h6 { margin-top: 24px; margin-bottom: 16px; font-weight: 600; line-height: 1.25; page-break-after: avoid; }
a { color: #0366d6; text-decoration: none; }
code { padding: .2em .4em; font-size: 85%; color: #d73a49; background: rgba(27,31,35,.05); border-radius: 3px; }
pre { padding: 16px; overflow: auto; font-size: 85%; line-height: 1.45; background: #f6f8fa; border-radius: 6px; page-break-inside: avoid; }
pre code { padding: 0; color: inherit; background: transparent; white-space: pre-wrap; }
blockquote { margin: 0 0 16px; padding: 0 1em; color: #6a737d; border-left: .25em solid #dfe2e5; }
table { border-collapse: collapse; margin-bottom: 16px; }
th, td { padding: 6px 13px; border: 1px solid #d0d7de; }
th { font-weight: 600; background: #f6f8fa; }
tr { page-break-inside: avoid; }
hr { height: .25em; margin: 24px 0; background: #e1e4e8; border: 0; }
img[src*="img.shields.io"] {
    display: inline-block;
    margin: 2px 4px;
    border: none;
    max-height: 20px;
    vertical-align: middle;
}
.markdown-body img:not([src*="img.shields.io"]) {
    display: block;
    max-width: 100%;
    height: auto;
    margin: 20px auto;
}
"#;

/// Render `markdown` to a complete HTML document.
pub fn render_html(markdown: &str, title: &str, base_dir: &Path) -> String {
    let body = render_body(markdown, base_dir);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n\
<article class=\"markdown-body\">\n{}</article>\n</body>\n</html>\n",
        escape_html(title),
        STYLESHEET,
        body
    )
}

/// Markdown → HTML fragment, with local images inlined.
pub fn render_body(markdown: &str, base_dir: &Path) -> String {
    let parser = Parser::new_ext(markdown, parser_options()).map(|event| match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: inline_image(dest_url, base_dir),
            title,
            id,
        }),
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn inline_image<'a>(src: CowStr<'a>, base_dir: &Path) -> CowStr<'a> {
    let Some(path) = resolve_src(&src, base_dir) else {
        debug!("Leaving image '{}' as is", src);
        return src;
    };
    match data_uri(&path) {
        Ok(uri) => uri.into(),
        Err(e) => {
            warn!("Cannot inline image {}: {}", path.display(), e);
            src
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_wraps_body_and_escapes_title() {
        let html = render_html("# Hi", "A <b> & c", Path::new("."));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>A &lt;b&gt; &amp; c</title>"));
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(html.contains("@page { size: auto; margin: 1cm; }"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn single_newline_renders_as_br() {
        let body = render_body("line one\nline two\n", Path::new("."));
        assert_eq!(body, "<p>line one<br />\nline two</p>\n");
    }

    #[test]
    fn tables_and_tasks_enabled() {
        let body = render_body("| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n", Path::new("."));
        assert!(body.contains("<table>"));
        assert!(body.contains("<th>a</th>"));
        assert!(body.contains("type=\"checkbox\""));
    }

    #[test]
    fn local_images_become_data_uris() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), b"\x89PNG").unwrap();
        let body = render_body("![pic](pic.png)", dir.path());
        assert!(body.contains("src=\"data:image/png;base64,iVBORw==\""), "{body}");
    }

    #[test]
    fn remote_and_missing_images_untouched() {
        let body = render_body(
            "![b](https://img.shields.io/badge/x-y-green) ![m](missing.png)",
            Path::new("."),
        );
        assert!(body.contains("src=\"https://img.shields.io/badge/x-y-green\""));
        assert!(body.contains("src=\"missing.png\""));
    }
}
