//! The parsed document tree handed to the layout mapper.
//!
//! Nodes mirror the HTML a Markdown renderer would emit (`h1`…`h6`, `p`,
//! `pre > code`, `ul`/`ol`, `table`, `a`, `img`) including the attributes
//! the mapper reads (`class`, `href`, `src`). The tree is built once per
//! document and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed set of element kinds the tree builder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Root of the tree.
    Document,
    /// `h1`…`h6`; the payload is the level (1–6).
    Heading(u8),
    Paragraph,
    /// `pre`: preformatted block, normally wrapping a single [`NodeKind::Code`].
    Pre,
    /// `code`: inline code, or the body of a `pre`.
    Code,
    BlockQuote,
    /// `ul` / `ol`. `start` is the first ordinal for ordered lists.
    List { ordered: bool, start: u64 },
    ListItem,
    Table,
    /// `thead`: holds the header row.
    TableHead,
    TableRow,
    TableCell,
    Image,
    Link,
    Text,
    Emphasis,
    Strong,
    LineBreak,
    Rule,
}

/// One element of the parsed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub kind: NodeKind,
    /// Literal text for [`NodeKind::Text`] and [`NodeKind::Code`] leaves.
    pub text: String,
    pub children: Vec<ContentNode>,
    pub attrs: BTreeMap<String, String>,
}

impl ContentNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            text: String::new(),
            children: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    /// A text leaf.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(NodeKind::Text)
        }
    }

    /// A leaf of `kind` carrying literal text (e.g. inline code).
    pub fn leaf(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new(kind)
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ContentNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Concatenated text of this node and all descendants.
    ///
    /// Line breaks contribute a newline; images contribute nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.kind {
            NodeKind::Text | NodeKind::Code => out.push_str(&self.text),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::Image => {}
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// True when the node's text content has no non-whitespace characters.
    pub fn is_blank(&self) -> bool {
        self.text_content().trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_flattens_inline_markup() {
        let p = ContentNode::new(NodeKind::Paragraph)
            .with_child(ContentNode::text("Run "))
            .with_child(ContentNode::leaf(NodeKind::Code, "cargo"))
            .with_child(
                ContentNode::new(NodeKind::Strong).with_child(ContentNode::text(" now")),
            );
        assert_eq!(p.text_content(), "Run cargo now");
    }

    #[test]
    fn images_have_no_text() {
        let p = ContentNode::new(NodeKind::Paragraph).with_child(
            ContentNode::new(NodeKind::Image)
                .with_attr("src", "a.png")
                .with_child(ContentNode::text("alt")),
        );
        assert!(p.is_blank());
    }

    #[test]
    fn attr_lookup() {
        let a = ContentNode::new(NodeKind::Link).with_attr("href", "https://example.com");
        assert_eq!(a.attr("href"), Some("https://example.com"));
        assert_eq!(a.attr("title"), None);
    }
}
