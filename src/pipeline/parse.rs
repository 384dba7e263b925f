//! Markdown → [`ContentNode`] tree.
//!
//! `pulldown-cmark` does the parsing; this module only folds its event
//! stream into a tree shaped like the HTML the same events would render to.

use crate::model::{ContentNode, NodeKind};
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use tracing::debug;

/// Extensions enabled for both backends.
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Parse Markdown into a tree rooted at a [`NodeKind::Document`] node.
pub fn parse_markdown(markdown: &str) -> ContentNode {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(markdown, parser_options()) {
        builder.event(event);
    }
    builder.finish()
}

static RE_BARE_PRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*<pre(?:\s[^>]*)?>(.*?)</pre>\s*$").unwrap());

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// First word of a fence info string (`rust,ignore` → `rust`).
pub(crate) fn fence_language(info: &str) -> Option<&str> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .filter(|lang| !lang.is_empty())
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

struct TreeBuilder {
    stack: Vec<ContentNode>,
    /// Raw text of the HTML block being collected, if any.
    html: Option<String>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![ContentNode::new(NodeKind::Document)],
            html: None,
        }
    }

    fn top(&mut self) -> &mut ContentNode {
        // The document root is never popped before `finish`.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn open(&mut self, node: ContentNode) {
        self.stack.push(node);
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                self.top().children.push(node);
            }
        }
    }

    fn append(&mut self, node: ContentNode) {
        self.top().children.push(node);
    }

    fn text(&mut self, text: &str) {
        let top = self.top();
        if top.kind == NodeKind::Code {
            top.text.push_str(text);
            return;
        }
        match top.children.last_mut() {
            Some(last) if last.kind == NodeKind::Text => last.text.push_str(text),
            _ => top.children.push(ContentNode::text(text)),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if let Some(html) = self.html.as_mut() {
                    html.push_str(&text);
                } else {
                    self.text(&text);
                }
            }
            Event::Code(code) => self.append(ContentNode::leaf(NodeKind::Code, code.to_string())),
            Event::Html(html) => match self.html.as_mut() {
                Some(buf) => buf.push_str(&html),
                None => debug!("Ignoring raw HTML: {}", html.trim()),
            },
            Event::InlineHtml(html) => debug!("Ignoring inline HTML: {}", html.trim()),
            // A newline inside a paragraph breaks the line.
            Event::SoftBreak | Event::HardBreak => {
                self.append(ContentNode::new(NodeKind::LineBreak))
            }
            Event::Rule => self.append(ContentNode::new(NodeKind::Rule)),
            Event::TaskListMarker(checked) => self.text(if checked { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open(ContentNode::new(NodeKind::Paragraph)),
            Tag::Heading { level, .. } => {
                self.open(ContentNode::new(NodeKind::Heading(heading_level(level))))
            }
            Tag::BlockQuote(_) => self.open(ContentNode::new(NodeKind::BlockQuote)),
            Tag::CodeBlock(kind) => {
                let mut code = ContentNode::new(NodeKind::Code);
                if let CodeBlockKind::Fenced(info) = &kind {
                    if let Some(lang) = fence_language(info) {
                        code = code.with_attr("class", format!("language-{lang}"));
                    }
                }
                self.open(ContentNode::new(NodeKind::Pre));
                self.open(code);
            }
            Tag::HtmlBlock => self.html = Some(String::new()),
            Tag::List(start) => self.open(ContentNode::new(NodeKind::List {
                ordered: start.is_some(),
                start: start.unwrap_or(1),
            })),
            Tag::Item => self.open(ContentNode::new(NodeKind::ListItem)),
            Tag::Table(_) => self.open(ContentNode::new(NodeKind::Table)),
            Tag::TableHead => {
                self.open(ContentNode::new(NodeKind::TableHead));
                self.open(ContentNode::new(NodeKind::TableRow));
            }
            Tag::TableRow => self.open(ContentNode::new(NodeKind::TableRow)),
            Tag::TableCell => self.open(ContentNode::new(NodeKind::TableCell)),
            Tag::Emphasis => self.open(ContentNode::new(NodeKind::Emphasis)),
            Tag::Strong => self.open(ContentNode::new(NodeKind::Strong)),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut link = ContentNode::new(NodeKind::Link);
                if !dest_url.is_empty() {
                    link = link.with_attr("href", dest_url.to_string());
                }
                if !title.is_empty() {
                    link = link.with_attr("title", title.to_string());
                }
                self.open(link);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut image =
                    ContentNode::new(NodeKind::Image).with_attr("src", dest_url.to_string());
                if !title.is_empty() {
                    image = image.with_attr("title", title.to_string());
                }
                self.open(image);
            }
            // Rendered as their plain content.
            Tag::Strikethrough
            | Tag::Superscript
            | Tag::Subscript
            | Tag::FootnoteDefinition(_)
            | Tag::MetadataBlock(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::CodeBlock | TagEnd::TableHead => {
                self.close();
                self.close();
            }
            TagEnd::Image => {
                let top = self.top();
                let alt: String = top.children.iter().map(ContentNode::text_content).collect();
                top.attrs.insert("alt".into(), alt);
                self.close();
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html.take() {
                    self.html_block(&html);
                }
            }
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::Table
            | TagEnd::TableRow
            | TagEnd::TableCell
            | TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Link => self.close(),
            TagEnd::Strikethrough
            | TagEnd::Superscript
            | TagEnd::Subscript
            | TagEnd::FootnoteDefinition
            | TagEnd::MetadataBlock(_)
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition => {}
        }
    }

    /// A bare `<pre>` block becomes a preformatted node without a code child.
    /// Every other HTML block is dropped.
    fn html_block(&mut self, html: &str) {
        match RE_BARE_PRE.captures(html) {
            Some(caps) if !caps[1].to_ascii_lowercase().contains("<code") => {
                let body = caps[1].strip_prefix('\n').unwrap_or(&caps[1]);
                let text = unescape_entities(body);
                self.append(ContentNode::new(NodeKind::Pre).with_child(ContentNode::text(text)));
            }
            _ => debug!("Ignoring HTML block ({} bytes)", html.len()),
        }
    }

    fn finish(mut self) -> ContentNode {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack
            .pop()
            .unwrap_or_else(|| ContentNode::new(NodeKind::Document))
    }
}
