//! Renderer-ready layout elements.
//!
//! A [`LayoutDocument`] is the ordered output of the layout mapper: each
//! element names its style and carries its own geometry, so the page-flow
//! builder can place it without looking at its neighbours.

use super::style::{StyleName, StyleSheet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Heading size tier below the document title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingTier {
    /// Level 2.
    A,
    /// Level 3.
    B,
    /// Levels 4–6.
    C,
}

impl HeadingTier {
    /// Tier for a Markdown heading level. Level 1 is the title, not a tier.
    pub fn for_level(level: u8) -> Option<Self> {
        match level {
            2 => Some(HeadingTier::A),
            3 => Some(HeadingTier::B),
            4..=6 => Some(HeadingTier::C),
            _ => None,
        }
    }

    pub fn style_name(self) -> StyleName {
        match self {
            HeadingTier::A => StyleName::HeadingA,
            HeadingTier::B => StyleName::HeadingB,
            HeadingTier::C => StyleName::HeadingC,
        }
    }
}

/// How an inline run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanStyle {
    Plain,
    Strong,
    Emphasis,
    /// Monospace, accent-coloured.
    Code,
    /// Link-coloured; clickable when the span has an href.
    Link,
}

/// A run of inline text with one style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Span {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
            href: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::Plain)
    }

    pub fn link(text: impl Into<String>, href: Option<String>) -> Self {
        Self {
            href,
            ..Self::new(text, SpanStyle::Link)
        }
    }
}

/// A paragraph-like block of inline spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub spans: Vec<Span>,
    pub style: StyleName,
}

impl TextBlock {
    pub fn new(spans: Vec<Span>, style: StyleName) -> Self {
        Self { spans, style }
    }

    /// All span text joined.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// One row of a code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeRow {
    /// Small-caps language label, already uppercased.
    Label(String),
    /// A non-blank source line.
    Line(String),
    /// A blank source line, kept so vertical spacing survives.
    Blank,
}

/// A code listing split into rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub rows: Vec<CodeRow>,
    /// Preformatted text without a `code` child: one unsplit row, no label.
    pub raw: bool,
}

impl CodeBlock {
    /// Number of source lines (labels excluded).
    pub fn line_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| !matches!(r, CodeRow::Label(_)))
            .count()
    }
}

/// One list entry with its resolved bullet or ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// `•` or `N.`.
    pub label: String,
    pub spans: Vec<Span>,
    /// Nesting depth, 0 for top-level items.
    pub depth: usize,
}

impl ListItem {
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Label and text as they appear on the page, e.g. `"1. a"`.
    pub fn display(&self) -> String {
        format!("{} {}", self.label, self.text())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBlock {
    pub ordered: bool,
    pub items: Vec<ListItem>,
}

/// Rows × columns of trimmed cell text. Every row has the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    pub rows: Vec<Vec<String>>,
    /// Leading rows drawn with the header style (0 or 1).
    pub header_rows: usize,
}

impl TableBlock {
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

/// A resolved image and the size it is drawn at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub path: PathBuf,
    /// Pixel size, or None when the format could not be probed.
    pub intrinsic: Option<(u32, u32)>,
    pub width: f32,
    pub height: f32,
}

/// One renderer-ready unit of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutElement {
    Title(String),
    Heading { tier: HeadingTier, text: String },
    Text(TextBlock),
    Code(CodeBlock),
    Link { text: String, href: Option<String> },
    List(ListBlock),
    Table(TableBlock),
    Image(ImageDescriptor),
    Spacer { height: f32 },
    Rule,
}

impl LayoutElement {
    /// Paragraph style the element is drawn with, if it draws text.
    pub fn style_name(&self) -> Option<StyleName> {
        match self {
            LayoutElement::Title(_) => Some(StyleName::Title),
            LayoutElement::Heading { tier, .. } => Some(tier.style_name()),
            LayoutElement::Text(block) => Some(block.style),
            LayoutElement::Code(code) if code.raw => Some(StyleName::CodeRaw),
            LayoutElement::Code(_) => Some(StyleName::CodeLine),
            LayoutElement::Link { .. } => Some(StyleName::Link),
            LayoutElement::List(_) => Some(StyleName::ListItem),
            LayoutElement::Table(_)
            | LayoutElement::Image(_)
            | LayoutElement::Spacer { .. }
            | LayoutElement::Rule => None,
        }
    }

    /// Title and headings keep with whatever follows them.
    pub fn keeps_with_next(&self) -> bool {
        matches!(self, LayoutElement::Title(_) | LayoutElement::Heading { .. })
    }
}

/// Output of the layout mapper: elements in document order plus the style table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    /// Text of the first level-1 heading, if any.
    pub title: Option<String>,
    pub elements: Vec<LayoutElement>,
    pub styles: StyleSheet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_tiers() {
        assert_eq!(HeadingTier::for_level(1), None);
        assert_eq!(HeadingTier::for_level(2), Some(HeadingTier::A));
        assert_eq!(HeadingTier::for_level(3), Some(HeadingTier::B));
        assert_eq!(HeadingTier::for_level(6), Some(HeadingTier::C));
        assert_eq!(HeadingTier::for_level(7), None);
    }

    #[test]
    fn list_item_display() {
        let item = ListItem {
            label: "2.".into(),
            spans: vec![Span::plain("b")],
            depth: 0,
        };
        assert_eq!(item.display(), "2. b");
    }

    #[test]
    fn code_line_count_skips_label() {
        let code = CodeBlock {
            language: Some("rust".into()),
            rows: vec![
                CodeRow::Label("RUST".into()),
                CodeRow::Line("fn main() {}".into()),
                CodeRow::Blank,
            ],
            raw: false,
        };
        assert_eq!(code.line_count(), 2);
    }

    #[test]
    fn layout_serialises_to_json() {
        let el = LayoutElement::Link {
            text: "docs".into(),
            href: Some("https://example.com".into()),
        };
        let json = serde_json::to_string(&el).unwrap();
        assert!(json.contains("https://example.com"));
    }
}
