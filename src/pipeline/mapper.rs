//! Layout mapper: walks a [`ContentNode`] tree and emits [`LayoutElement`]s.
//!
//! One pass, top to bottom, over block-level nodes. Inline content of a
//! block is flattened into styled [`Span`]s; images found inside a block are
//! emitted as their own elements right after it. The walk never looks inside
//! the inline markup of a code node.
//!
//! ## Per-kind rules
//!
//! | Node                  | Output                                         |
//! |-----------------------|------------------------------------------------|
//! | heading 1             | `Title`                                        |
//! | heading 2 / 3 / 4–6   | `Heading` tier A / B / C                       |
//! | paragraph             | `Text`, or `Link` when it is only a link       |
//! | `pre > code`          | `Code` split into label / line / blank rows    |
//! | `pre` without `code`  | raw `Code`, one unsplit row                    |
//! | blockquote            | `Text` in the quote style, per block child     |
//! | list                  | `List`, nested lists flattened with depth      |
//! | table                 | `Table` + `Spacer`; nothing when it has no rows|
//! | image                 | `Image`, placeholder `Text`, or nothing        |
//! | rule                  | `Rule`                                         |
//!
//! Whitespace-only headings, paragraphs and code blocks produce nothing.
//!
//! A code block, table or image inside a list item closes the pending
//! `List`; the items after it open a new one and keep counting.

use crate::error::NodeError;
use crate::model::{
    CodeBlock, CodeRow, ContentNode, HeadingTier, LayoutDocument, LayoutElement, ListBlock,
    ListItem, NodeKind, Span, SpanStyle, StyleName, StyleSheet, TableBlock, TextBlock,
};
use crate::pipeline::context::RunContext;
use crate::pipeline::image::{self, HeaderProber, ImageProber};
use tracing::debug;

/// Bullet drawn before unordered list items.
pub const BULLET: &str = "\u{2022}";

/// Vertical space after a code block.
pub const CODE_SPACER: f32 = 6.0;
/// Vertical space after a table.
pub const TABLE_SPACER: f32 = 10.0;
/// Vertical space after an image.
pub const IMAGE_SPACER: f32 = 8.0;

/// Map a document tree using the default image prober.
pub fn map_document(root: &ContentNode, ctx: &mut RunContext) -> LayoutDocument {
    map_document_with(root, ctx, &HeaderProber)
}

/// Map a document tree, sizing images with `prober`.
pub fn map_document_with(
    root: &ContentNode,
    ctx: &mut RunContext,
    prober: &dyn ImageProber,
) -> LayoutDocument {
    let mut mapper = LayoutMapper {
        ctx,
        prober,
        elements: Vec::new(),
        pending_list: None,
        title: None,
    };
    mapper.block(root);
    mapper.flush_list();
    debug!("Mapped {} layout elements", mapper.elements.len());
    LayoutDocument {
        title: mapper.title,
        elements: mapper.elements,
        styles: StyleSheet::default(),
    }
}

struct LayoutMapper<'a> {
    ctx: &'a mut RunContext,
    prober: &'a dyn ImageProber,
    elements: Vec<LayoutElement>,
    /// List items not yet emitted; any other element closes the list first.
    pending_list: Option<ListBlock>,
    title: Option<String>,
}

impl LayoutMapper<'_> {
    fn push(&mut self, element: LayoutElement) {
        self.flush_list();
        self.elements.push(element);
    }

    fn flush_list(&mut self) {
        if let Some(list) = self.pending_list.take() {
            if !list.items.is_empty() {
                self.elements.push(LayoutElement::List(list));
            }
        }
    }

    fn blocks(&mut self, nodes: &[ContentNode]) {
        for node in nodes {
            self.block(node);
        }
    }

    fn block(&mut self, node: &ContentNode) {
        match node.kind {
            NodeKind::Document => self.blocks(&node.children),
            NodeKind::Heading(level) => self.heading(level, node),
            NodeKind::Paragraph | NodeKind::ListItem | NodeKind::TableCell => {
                self.paragraph(&node.children, StyleName::Body)
            }
            NodeKind::Pre => self.preformatted(node),
            NodeKind::Code => {
                let spans = inline_spans(std::slice::from_ref(node));
                if !spans.is_empty() {
                    self.push(LayoutElement::Text(TextBlock::new(spans, StyleName::Body)));
                }
            }
            NodeKind::BlockQuote => self.quote(node),
            NodeKind::List { ordered, start } => self.list(node, ordered, start),
            NodeKind::Table | NodeKind::TableHead | NodeKind::TableRow => self.table(node),
            NodeKind::Image => self.image(node),
            NodeKind::Link => self.link(node),
            NodeKind::Text | NodeKind::Emphasis | NodeKind::Strong => {
                self.paragraph(std::slice::from_ref(node), StyleName::Body)
            }
            NodeKind::LineBreak => {}
            NodeKind::Rule => self.push(LayoutElement::Rule),
        }
    }

    // ── Headings ─────────────────────────────────────────────────────────

    fn heading(&mut self, level: u8, node: &ContentNode) {
        let text = collapse_whitespace(&node.text_content());
        if text.is_empty() {
            return;
        }
        match HeadingTier::for_level(level) {
            Some(tier) => self.push(LayoutElement::Heading { tier, text }),
            None => {
                if self.title.is_none() {
                    self.title = Some(text.clone());
                }
                self.push(LayoutElement::Title(text));
            }
        }
        self.trailing_images(&node.children);
    }

    // ── Paragraph-like blocks ────────────────────────────────────────────

    fn paragraph(&mut self, children: &[ContentNode], style: StyleName) {
        if let Some(link) = sole_link(children) {
            self.link(link);
            self.trailing_images(children);
            return;
        }
        let spans = inline_spans(children);
        if !spans.is_empty() {
            self.push(LayoutElement::Text(TextBlock::new(spans, style)));
        }
        self.trailing_images(children);
    }

    fn link(&mut self, node: &ContentNode) {
        let href = node
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        let mut text = collapse_whitespace(&node.text_content());
        if text.is_empty() {
            match &href {
                // An image-only link draws its image; the caller emits it.
                Some(_) if contains_image(node) => return,
                Some(h) => text = h.clone(),
                None => return,
            }
        }
        self.push(LayoutElement::Link { text, href });
    }

    fn quote(&mut self, node: &ContentNode) {
        for child in &node.children {
            match child.kind {
                NodeKind::BlockQuote => self.quote(child),
                NodeKind::Paragraph | NodeKind::Heading(_) => {
                    self.paragraph(&child.children, StyleName::Quote)
                }
                NodeKind::Text | NodeKind::Emphasis | NodeKind::Strong | NodeKind::Link => {
                    self.paragraph(std::slice::from_ref(child), StyleName::Quote)
                }
                _ => self.block(child),
            }
        }
    }

    /// Emit every image nested in `nodes`, in document order.
    fn trailing_images(&mut self, nodes: &[ContentNode]) {
        for node in nodes {
            match node.kind {
                NodeKind::Image => self.image(node),
                NodeKind::List { .. } | NodeKind::Pre | NodeKind::Table => {}
                _ => self.trailing_images(&node.children),
            }
        }
    }

    // ── Code ─────────────────────────────────────────────────────────────

    fn preformatted(&mut self, node: &ContentNode) {
        let Some(code) = node.children.iter().find(|c| c.kind == NodeKind::Code) else {
            let text = normalize_newlines(&node.text_content());
            let text = text.strip_suffix('\n').unwrap_or(&text);
            if text.trim().is_empty() {
                return;
            }
            self.push(LayoutElement::Code(CodeBlock {
                language: None,
                rows: vec![CodeRow::Line(text.to_string())],
                raw: true,
            }));
            self.push(LayoutElement::Spacer {
                height: CODE_SPACER,
            });
            return;
        };

        let language = language_from_class(code.attr("class"))
            .or_else(|| language_from_class(node.attr("class")));
        let text = normalize_newlines(&code.text_content());
        let body = text.strip_suffix('\n').unwrap_or(&text);
        if body.trim().is_empty() {
            return;
        }

        let mut rows = Vec::with_capacity(body.lines().count() + 1);
        if let Some(lang) = &language {
            rows.push(CodeRow::Label(lang.to_uppercase()));
        }
        for line in body.split('\n') {
            if line.trim().is_empty() {
                rows.push(CodeRow::Blank);
            } else {
                rows.push(CodeRow::Line(line.trim_end().to_string()));
            }
        }

        self.push(LayoutElement::Code(CodeBlock {
            language,
            rows,
            raw: false,
        }));
        self.push(LayoutElement::Spacer {
            height: CODE_SPACER,
        });
    }

    // ── Lists ────────────────────────────────────────────────────────────

    fn list(&mut self, node: &ContentNode, ordered: bool, start: u64) {
        self.list_items(node, ordered, start, 0, ordered);
        self.flush_list();
    }

    /// Queue the items of `list`, emitting nested blocks where they occur.
    ///
    /// `outer` is the kind of the top-level list, used when a split starts
    /// a new `List` element.
    fn list_items(
        &mut self,
        list: &ContentNode,
        ordered: bool,
        start: u64,
        depth: usize,
        outer: bool,
    ) {
        let mut ordinal = start;
        for item in list.children.iter().filter(|c| c.kind == NodeKind::ListItem) {
            let label = if ordered {
                format!("{ordinal}.")
            } else {
                BULLET.to_string()
            };
            ordinal += 1;

            self.pending_list
                .get_or_insert_with(|| ListBlock {
                    ordered: outer,
                    items: Vec::new(),
                })
                .items
                .push(ListItem {
                    label,
                    spans: inline_spans(&item.children),
                    depth,
                });

            for child in &item.children {
                match child.kind {
                    NodeKind::List { ordered, start } => {
                        self.list_items(child, ordered, start, depth + 1, outer)
                    }
                    NodeKind::Pre => self.preformatted(child),
                    NodeKind::Table => self.table(child),
                    _ => self.trailing_images(std::slice::from_ref(child)),
                }
            }
        }
    }

    // ── Tables ───────────────────────────────────────────────────────────

    fn table(&mut self, node: &ContentNode) {
        let mut rows = Vec::new();
        let mut header_rows = 0;
        collect_rows(node, false, &mut rows, &mut header_rows);

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.is_empty() || columns == 0 {
            return;
        }
        for row in &mut rows {
            row.resize(columns, String::new());
        }

        self.push(LayoutElement::Table(TableBlock {
            rows,
            header_rows: header_rows.min(1),
        }));
        self.push(LayoutElement::Spacer {
            height: TABLE_SPACER,
        });
    }

    // ── Images ───────────────────────────────────────────────────────────

    fn image(&mut self, node: &ContentNode) {
        let src = node.attr("src").unwrap_or_default();
        let Some(path) = image::resolve_src(src, self.ctx.base_dir()) else {
            debug!("Skipping unresolved image '{}'", src);
            return;
        };

        let image_box = *self.ctx.image_box();
        match image::describe(path.clone(), &image_box, self.prober) {
            Ok(descriptor) => {
                self.push(LayoutElement::Image(descriptor));
                self.push(LayoutElement::Spacer {
                    height: IMAGE_SPACER,
                });
            }
            Err(e) => {
                self.ctx.warn(NodeError::ImageUnreadable {
                    path: path.clone(),
                    detail: e.to_string(),
                });
                self.push(LayoutElement::Text(TextBlock::new(
                    vec![Span::plain(format!("[Image unavailable: {}]", path.display()))],
                    StyleName::Placeholder,
                )));
            }
        }
    }
}

// ── Inline spans ─────────────────────────────────────────────────────────

/// Flatten inline content into styled spans with outer whitespace trimmed.
///
/// Returns an empty vector when the content has no visible text.
pub fn inline_spans(nodes: &[ContentNode]) -> Vec<Span> {
    let mut spans = Vec::new();
    collect_spans(nodes, SpanStyle::Plain, None, &mut spans);
    trim_spans(spans)
}

fn collect_spans(
    nodes: &[ContentNode],
    style: SpanStyle,
    href: Option<&str>,
    out: &mut Vec<Span>,
) {
    for node in nodes {
        match node.kind {
            NodeKind::Text => push_span(out, &node.text, style, href),
            NodeKind::Code => push_span(out, &node.text, SpanStyle::Code, None),
            NodeKind::LineBreak => push_span(out, "\n", style, href),
            NodeKind::Strong => {
                let inner = match style {
                    SpanStyle::Plain | SpanStyle::Emphasis => SpanStyle::Strong,
                    other => other,
                };
                collect_spans(&node.children, inner, href, out);
            }
            NodeKind::Emphasis => {
                let inner = match style {
                    SpanStyle::Plain => SpanStyle::Emphasis,
                    other => other,
                };
                collect_spans(&node.children, inner, href, out);
            }
            NodeKind::Link => {
                let target = node.attr("href").filter(|h| !h.trim().is_empty());
                collect_spans(&node.children, SpanStyle::Link, target, out);
            }
            NodeKind::Paragraph | NodeKind::Heading(_) | NodeKind::BlockQuote => {
                if !out.is_empty() {
                    push_span(out, " ", style, href);
                }
                collect_spans(&node.children, style, href, out);
            }
            NodeKind::Image
            | NodeKind::Pre
            | NodeKind::List { .. }
            | NodeKind::Table
            | NodeKind::Rule => {}
            NodeKind::Document
            | NodeKind::ListItem
            | NodeKind::TableHead
            | NodeKind::TableRow
            | NodeKind::TableCell => collect_spans(&node.children, style, href, out),
        }
    }
}

fn push_span(out: &mut Vec<Span>, text: &str, style: SpanStyle, href: Option<&str>) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut() {
        if last.style == style && last.href.as_deref() == href {
            last.text.push_str(text);
            return;
        }
    }
    out.push(Span {
        text: text.to_string(),
        style,
        href: href.map(str::to_string),
    });
}

fn trim_spans(mut spans: Vec<Span>) -> Vec<Span> {
    if let Some(first) = spans.first_mut() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = spans.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
    spans.retain(|s| !s.text.is_empty());
    if spans.iter().all(|s| s.text.trim().is_empty()) {
        spans.clear();
    }
    spans
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// The link a paragraph consists of, ignoring surrounding whitespace.
fn sole_link(children: &[ContentNode]) -> Option<&ContentNode> {
    let mut visible = children
        .iter()
        .filter(|c| !(c.kind == NodeKind::Text && c.text.trim().is_empty()));
    let first = visible.next()?;
    if visible.next().is_some() || first.kind != NodeKind::Link || first.is_blank() {
        return None;
    }
    Some(first)
}

fn contains_image(node: &ContentNode) -> bool {
    node.kind == NodeKind::Image || node.children.iter().any(contains_image)
}

fn collect_rows(
    node: &ContentNode,
    in_head: bool,
    rows: &mut Vec<Vec<String>>,
    header_rows: &mut usize,
) {
    match node.kind {
        NodeKind::TableRow => {
            let cells = node
                .children
                .iter()
                .filter(|c| c.kind == NodeKind::TableCell)
                .map(|c| collapse_whitespace(&c.text_content()))
                .collect();
            // Only a head that leads the table counts as a header.
            if in_head && rows.len() == *header_rows {
                *header_rows += 1;
            }
            rows.push(cells);
        }
        NodeKind::TableHead => {
            for child in &node.children {
                collect_rows(child, true, rows, header_rows);
            }
        }
        _ => {
            for child in &node.children {
                collect_rows(child, in_head, rows, header_rows);
            }
        }
    }
}

/// Language from a `language-<name>` class token.
pub fn language_from_class(class: Option<&str>) -> Option<String> {
    class?
        .split_whitespace()
        .find_map(|token| token.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::image::{ImageBox, Probe};
    use crate::pipeline::parse::parse_markdown;
    use std::io;
    use std::path::Path;

    fn ctx() -> RunContext {
        RunContext::new(".", ImageBox::default()).unwrap()
    }

    fn map(markdown: &str) -> Vec<LayoutElement> {
        map_document(&parse_markdown(markdown), &mut ctx()).elements
    }

    fn code_block(el: &LayoutElement) -> &CodeBlock {
        match el {
            LayoutElement::Code(code) => code,
            other => panic!("expected code, got {other:?}"),
        }
    }

    struct FixedProber(io::Result<Probe>);

    impl ImageProber for FixedProber {
        fn probe(&self, _path: &Path) -> io::Result<Probe> {
            match &self.0 {
                Ok(p) => Ok(*p),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    #[test]
    fn heading_levels_map_to_tiers() {
        let els = map("# Top\n\n## Two\n\n### Three\n\n#### Four\n\n###### Six\n");
        assert_eq!(els[0], LayoutElement::Title("Top".into()));
        assert!(matches!(els[1], LayoutElement::Heading { tier: HeadingTier::A, .. }));
        assert!(matches!(els[2], LayoutElement::Heading { tier: HeadingTier::B, .. }));
        assert!(matches!(els[3], LayoutElement::Heading { tier: HeadingTier::C, .. }));
        assert!(matches!(els[4], LayoutElement::Heading { tier: HeadingTier::C, .. }));
    }

    #[test]
    fn first_h1_becomes_document_title() {
        let doc = map_document(&parse_markdown("# One\n\n# Two\n"), &mut ctx());
        assert_eq!(doc.title.as_deref(), Some("One"));
    }

    #[test]
    fn empty_paragraphs_and_headings_produce_nothing() {
        let tree = ContentNode::new(NodeKind::Document)
            .with_child(ContentNode::new(NodeKind::Heading(2)).with_child(ContentNode::text("  ")))
            .with_child(ContentNode::new(NodeKind::Paragraph))
            .with_child(
                ContentNode::new(NodeKind::Paragraph).with_child(ContentNode::text(" \n\t ")),
            );
        let doc = map_document(&tree, &mut ctx());
        assert!(doc.elements.is_empty());
    }

    #[test]
    fn paragraph_text_is_trimmed_with_inline_styles() {
        let els = map("Use `cargo` **now** and *later*.\n");
        let LayoutElement::Text(block) = &els[0] else {
            panic!("expected text");
        };
        assert_eq!(block.plain_text(), "Use cargo now and later.");
        let styles: Vec<_> = block.spans.iter().map(|s| s.style).collect();
        assert_eq!(
            styles,
            vec![
                SpanStyle::Plain,
                SpanStyle::Code,
                SpanStyle::Plain,
                SpanStyle::Strong,
                SpanStyle::Plain,
                SpanStyle::Emphasis,
                SpanStyle::Plain,
            ]
        );
    }

    #[test]
    fn inline_link_keeps_href() {
        let els = map("See [the docs](https://example.com/docs) for more.\n");
        let LayoutElement::Text(block) = &els[0] else {
            panic!("expected text");
        };
        let link = block.spans.iter().find(|s| s.style == SpanStyle::Link).unwrap();
        assert_eq!(link.text, "the docs");
        assert_eq!(link.href.as_deref(), Some("https://example.com/docs"));
    }

    #[test]
    fn paragraph_of_one_link_is_a_block_link() {
        let els = map("[Project home](https://example.com)\n");
        assert_eq!(
            els,
            vec![LayoutElement::Link {
                text: "Project home".into(),
                href: Some("https://example.com".into()),
            }]
        );
    }

    #[test]
    fn link_without_href_is_colour_only() {
        let tree = ContentNode::new(NodeKind::Document)
            .with_child(ContentNode::new(NodeKind::Link).with_child(ContentNode::text("anchor")));
        let doc = map_document(&tree, &mut ctx());
        assert_eq!(
            doc.elements,
            vec![LayoutElement::Link {
                text: "anchor".into(),
                href: None,
            }]
        );
    }

    #[test]
    fn fenced_code_rows() {
        let els = map("```python\ndef f():\n\n    return 1\n```\n");
        let code = code_block(&els[0]);
        assert_eq!(code.language.as_deref(), Some("python"));
        assert_eq!(
            code.rows,
            vec![
                CodeRow::Label("PYTHON".into()),
                CodeRow::Line("def f():".into()),
                CodeRow::Blank,
                CodeRow::Line("    return 1".into()),
            ]
        );
        assert_eq!(els[1], LayoutElement::Spacer { height: CODE_SPACER });
    }

    #[test]
    fn crlf_and_cr_are_normalised() {
        let tree = ContentNode::new(NodeKind::Document).with_child(
            ContentNode::new(NodeKind::Pre).with_child(
                ContentNode::leaf(NodeKind::Code, "a\r\nb\rc\r\n")
                    .with_attr("class", "language-sh"),
            ),
        );
        let doc = map_document(&tree, &mut ctx());
        let code = code_block(&doc.elements[0]);
        assert_eq!(
            code.rows,
            vec![
                CodeRow::Label("SH".into()),
                CodeRow::Line("a".into()),
                CodeRow::Line("b".into()),
                CodeRow::Line("c".into()),
            ]
        );
    }

    #[test]
    fn malformed_class_means_no_label() {
        assert_eq!(language_from_class(Some("highlight language-")), None);
        assert_eq!(language_from_class(Some("lang-rust")), None);
        assert_eq!(language_from_class(None), None);
        assert_eq!(
            language_from_class(Some("hl language-go")).as_deref(),
            Some("go")
        );

        let els = map("```\nplain\n```\n");
        let code = code_block(&els[0]);
        assert_eq!(code.rows, vec![CodeRow::Line("plain".into())]);
    }

    #[test]
    fn pre_without_code_is_raw() {
        let tree = ContentNode::new(NodeKind::Document).with_child(
            ContentNode::new(NodeKind::Pre).with_child(ContentNode::text("one\n\ntwo\n")),
        );
        let doc = map_document(&tree, &mut ctx());
        let code = code_block(&doc.elements[0]);
        assert!(code.raw);
        assert_eq!(code.language, None);
        assert_eq!(code.rows, vec![CodeRow::Line("one\n\ntwo".into())]);
    }

    #[test]
    fn ordered_lists_number_independently() {
        let els = map("1. a\n2. b\n3. c\n\nBetween.\n\n1. x\n2. y\n");
        let lists: Vec<_> = els
            .iter()
            .filter_map(|e| match e {
                LayoutElement::List(l) => Some(l),
                _ => None,
            })
            .collect();
        assert_eq!(lists.len(), 2);
        let first: Vec<_> = lists[0].items.iter().map(ListItem::display).collect();
        assert_eq!(first, vec!["1. a", "2. b", "3. c"]);
        let second: Vec<_> = lists[1].items.iter().map(ListItem::display).collect();
        assert_eq!(second, vec!["1. x", "2. y"]);
    }

    #[test]
    fn nested_lists_are_flattened_with_depth() {
        let els = map("- top\n  1. inner a\n  2. inner b\n- next\n");
        let LayoutElement::List(list) = &els[0] else {
            panic!("expected list");
        };
        let summary: Vec<_> = list
            .items
            .iter()
            .map(|i| (i.display(), i.depth))
            .collect();
        assert_eq!(
            summary,
            vec![
                (format!("{BULLET} top"), 0),
                ("1. inner a".to_string(), 1),
                ("2. inner b".to_string(), 1),
                (format!("{BULLET} next"), 0),
            ]
        );
    }

    #[test]
    fn code_inside_list_item_keeps_document_order() {
        let els = map("1. Install:\n\n   ```sh\n   cargo install x\n   ```\n\n2. Run it\n");
        assert_eq!(els.len(), 4, "{els:?}");
        let LayoutElement::List(first) = &els[0] else {
            panic!("expected list, got {:?}", els[0]);
        };
        let first: Vec<_> = first.items.iter().map(ListItem::display).collect();
        assert_eq!(first, vec!["1. Install:"]);
        assert_eq!(
            code_block(&els[1]).rows,
            vec![
                CodeRow::Label("SH".into()),
                CodeRow::Line("cargo install x".into()),
            ]
        );
        assert_eq!(els[2], LayoutElement::Spacer { height: CODE_SPACER });
        let LayoutElement::List(rest) = &els[3] else {
            panic!("expected list, got {:?}", els[3]);
        };
        assert!(rest.ordered);
        let rest: Vec<_> = rest.items.iter().map(ListItem::display).collect();
        assert_eq!(rest, vec!["2. Run it"]);
    }

    #[test]
    fn table_in_nested_item_splits_outer_list() {
        let els = map("- a\n  - b\n\n    | h |\n    |---|\n    | v |\n\n- c\n");
        let kinds: Vec<_> = els
            .iter()
            .map(|e| match e {
                LayoutElement::List(l) => format!("list:{}", l.items.len()),
                LayoutElement::Table(_) => "table".to_string(),
                LayoutElement::Spacer { .. } => "spacer".to_string(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec!["list:2", "table", "spacer", "list:1"]);
        let LayoutElement::List(rest) = &els[3] else {
            unreachable!()
        };
        assert_eq!(rest.items[0].depth, 0);
        assert!(!rest.ordered);
    }

    #[test]
    fn ordered_list_honours_start_number() {
        let els = map("4. four\n5. five\n");
        let LayoutElement::List(list) = &els[0] else {
            panic!("expected list");
        };
        assert_eq!(list.items[0].label, "4.");
        assert_eq!(list.items[1].label, "5.");
    }

    #[test]
    fn empty_list_emits_nothing() {
        let tree = ContentNode::new(NodeKind::Document).with_child(ContentNode::new(
            NodeKind::List {
                ordered: true,
                start: 1,
            },
        ));
        assert!(map_document(&tree, &mut ctx()).elements.is_empty());
    }

    #[test]
    fn table_rows_are_trimmed_and_padded() {
        let els = map("| Name | Value |\n|---|---|\n|  a  | 1 |\n| b |\n");
        let LayoutElement::Table(table) = &els[0] else {
            panic!("expected table");
        };
        assert_eq!(table.header_rows, 1);
        assert_eq!(
            table.rows,
            vec![
                vec!["Name".to_string(), "Value".to_string()],
                vec!["a".to_string(), "1".to_string()],
                vec!["b".to_string(), String::new()],
            ]
        );
        assert_eq!(els[1], LayoutElement::Spacer { height: TABLE_SPACER });
    }

    #[test]
    fn zero_row_table_emits_nothing() {
        let tree =
            ContentNode::new(NodeKind::Document).with_child(ContentNode::new(NodeKind::Table));
        assert!(map_document(&tree, &mut ctx()).elements.is_empty());
    }

    #[test]
    fn blockquote_uses_quote_style() {
        let els = map("> quoted text\n>\n> second\n");
        assert_eq!(els.len(), 2);
        for el in &els {
            assert_eq!(el.style_name(), Some(StyleName::Quote));
        }
    }

    #[test]
    fn missing_image_produces_nothing() {
        let els = map("![gone](does/not/exist.png)\n");
        assert!(els.is_empty());
    }

    #[test]
    fn remote_badge_produces_nothing() {
        let els = map("[![build](https://img.shields.io/badge/x.svg)](https://ci.example.com)\n");
        assert!(els.is_empty());
    }

    #[test]
    fn image_is_scaled_and_follows_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chart.png"), b"stub").unwrap();
        let mut ctx = RunContext::new(dir.path(), ImageBox::from_inches(5.5, 7.0, 300.0)).unwrap();
        let prober = FixedProber(Ok(Probe::Size(4000, 1000)));
        let tree = parse_markdown("Intro ![chart](chart.png) text\n");
        let doc = map_document_with(&tree, &mut ctx, &prober);

        assert!(matches!(doc.elements[0], LayoutElement::Text(_)));
        let LayoutElement::Image(img) = &doc.elements[1] else {
            panic!("expected image after text");
        };
        assert!((img.width - 1650.0).abs() < 1e-3);
        assert!((img.height - 412.5).abs() < 1e-3);
    }

    #[test]
    fn unreadable_image_becomes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("locked.png"), b"stub").unwrap();
        let mut ctx = RunContext::new(dir.path(), ImageBox::default()).unwrap();
        let prober = FixedProber(Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        )));
        let tree = parse_markdown("![x](locked.png)\n\nafter\n");
        let doc = map_document_with(&tree, &mut ctx, &prober);

        let LayoutElement::Text(block) = &doc.elements[0] else {
            panic!("expected placeholder");
        };
        assert_eq!(block.style, StyleName::Placeholder);
        assert!(block.plain_text().starts_with("[Image unavailable: "));
        assert!(matches!(doc.elements[1], LayoutElement::Text(_)));
        assert_eq!(ctx.warnings().len(), 1);
    }

    #[test]
    fn rule_is_kept() {
        assert_eq!(map("a\n\n---\n\nb\n")[1], LayoutElement::Rule);
    }

    #[test]
    fn mapping_is_idempotent() {
        let tree = parse_markdown(
            "# T\n\nText with `code`.\n\n```js\nlet a = 1;\n```\n\n- a\n- b\n\n| h |\n|---|\n| v |\n",
        );
        let mut ctx = ctx();
        let first = map_document(&tree, &mut ctx);
        let second = map_document(&tree, &mut ctx);
        assert_eq!(first, second);
    }
}
