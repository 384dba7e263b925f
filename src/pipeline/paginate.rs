//! Page flow: measure layout elements, wrap their text, and place them on pages.
//!
//! Every element becomes a block of rows. Rows are the unit of page
//! breaking: a text line, a code line, a table row or a whole image. Blocks
//! are placed top to bottom; when a block does not fit, [`decide_break`]
//! chooses between splitting it and moving it to the next page.
//!
//! The output is a list of [`Page`]s holding draw operations in PDF user
//! space (origin bottom-left, y up).

use crate::config::PageGeometry;
use crate::model::{
    CodeBlock, CodeRow, Color, FontFace, ImageDescriptor, LayoutDocument, LayoutElement,
    ListBlock, ParagraphStyle, Span, SpanStyle, StyleName, StyleSheet, TableBlock,
};
use crate::pipeline::metrics::{expand_tabs, monospace_columns, text_width};
use serde::Serialize;
use std::ops::Range;
use std::path::PathBuf;
use tracing::debug;

/// Minimum code rows kept together at either side of a page break.
pub const CODE_MIN_ROWS: usize = 2;

const CODE_PAD_X: f32 = 8.0;
const CODE_PAD_Y: f32 = 5.0;
const LIST_INDENT_STEP: f32 = 16.0;
const LABEL_GAP: f32 = 4.0;
const QUOTE_BAR_WIDTH: f32 = 3.0;
const RULE_HEIGHT: f32 = 12.0;
const EPSILON: f32 = 0.01;

// ── Output ───────────────────────────────────────────────────────────────

/// One positioned drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawOp {
    /// Text with its baseline starting at (`x`, `y`).
    Text {
        x: f32,
        y: f32,
        font: FontFace,
        size: f32,
        color: Color,
        text: String,
    },
    /// Filled rectangle with its lower-left corner at (`x`, `y`).
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Color,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Color,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        path: PathBuf,
    },
    /// Clickable area pointing at `href`.
    Link {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        href: String,
    },
}

impl DrawOp {
    /// Move an op laid out top-down relative to a row into page space.
    ///
    /// In row space `y` is measured downwards from the row top; for text it
    /// is the baseline, for boxes the top edge.
    fn placed(&self, dx: f32, top: f32, page_height: f32) -> DrawOp {
        let flip = |y: f32| page_height - (top + y);
        match self {
            DrawOp::Text {
                x,
                y,
                font,
                size,
                color,
                text,
            } => DrawOp::Text {
                x: x + dx,
                y: flip(*y),
                font: *font,
                size: *size,
                color: *color,
                text: text.clone(),
            },
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => DrawOp::Rect {
                x: x + dx,
                y: flip(y + height),
                width: *width,
                height: *height,
                fill: *fill,
            },
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
            } => DrawOp::Line {
                x1: x1 + dx,
                y1: flip(*y1),
                x2: x2 + dx,
                y2: flip(*y2),
                width: *width,
                color: *color,
            },
            DrawOp::Image {
                x,
                y,
                width,
                height,
                path,
            } => DrawOp::Image {
                x: x + dx,
                y: flip(y + height),
                width: *width,
                height: *height,
                path: path.clone(),
            },
            DrawOp::Link {
                x,
                y,
                width,
                height,
                href,
            } => DrawOp::Link {
                x: x + dx,
                y: flip(y + height),
                width: *width,
                height: *height,
                href: href.clone(),
            },
        }
    }
}

/// One output page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Text runs on the page in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

// ── Break decisions ──────────────────────────────────────────────────────

/// What to do with a block at the current position.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// The whole block fits.
    Place,
    /// Start the block on the next page.
    MoveToNextPage,
    /// Place the first `rows_on_current_page` rows here, the rest after a break.
    Split { rows_on_current_page: usize },
}

/// Decide how rows of the given heights fit into `remaining` points.
///
/// `min_orphan` rows must stay on the current page and `min_widow` rows must
/// move to the next one for a split to be accepted.
pub fn decide_break(
    remaining: f32,
    row_heights: &[f32],
    breakable: bool,
    min_orphan: usize,
    min_widow: usize,
) -> BreakDecision {
    let total: f32 = row_heights.iter().sum();
    if total <= remaining + EPSILON {
        return BreakDecision::Place;
    }
    if !breakable {
        return BreakDecision::MoveToNextPage;
    }

    let fit = fitting_rows(remaining, row_heights);
    let count = row_heights.len();
    if fit == 0 || (fit < min_orphan && fit < count) {
        return BreakDecision::MoveToNextPage;
    }

    let left = count - fit;
    if left > 0 && left < min_widow {
        let adjusted = fit.saturating_sub(min_widow - left);
        if adjusted == 0 || adjusted < min_orphan {
            return BreakDecision::MoveToNextPage;
        }
        return BreakDecision::Split {
            rows_on_current_page: adjusted,
        };
    }

    BreakDecision::Split {
        rows_on_current_page: fit,
    }
}

fn fitting_rows(remaining: f32, row_heights: &[f32]) -> usize {
    let mut used = 0.0;
    let mut fit = 0;
    for &h in row_heights {
        if used + h > remaining + EPSILON {
            break;
        }
        used += h;
        fit += 1;
    }
    fit
}

// ── Blocks ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Row {
    height: f32,
    ops: Vec<DrawOp>,
}

impl Row {
    fn empty(height: f32) -> Self {
        Self {
            height,
            ops: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Decoration {
    /// Background behind the whole fragment.
    Fill(Color),
    /// Vertical bar at `x` along the fragment.
    Bar { x: f32, color: Color },
}

#[derive(Debug, Clone)]
struct Block {
    rows: Vec<Row>,
    space_before: f32,
    space_after: f32,
    breakable: bool,
    min_orphan: usize,
    min_widow: usize,
    keep_with_next: bool,
    /// Move to a fresh page instead of splitting when the whole block fits one.
    keep_whole: bool,
    decoration: Option<Decoration>,
    /// Vertical padding inside the decoration, above and below each fragment.
    padding: f32,
    /// Row repeated at the top of every continuation fragment.
    header: Option<Row>,
}

impl Block {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            space_before: 0.0,
            space_after: 0.0,
            breakable: true,
            min_orphan: 1,
            min_widow: 1,
            keep_with_next: false,
            keep_whole: false,
            decoration: None,
            padding: 0.0,
            header: None,
        }
    }

    fn height(&self) -> f32 {
        self.rows.iter().map(|r| r.height).sum::<f32>() + 2.0 * self.padding
    }

    /// Space needed to start the block on a page `page_height` tall.
    fn lead_height(&self, page_height: f32) -> f32 {
        let whole = self.height();
        let lead = if self.keep_whole && whole <= page_height {
            whole
        } else {
            self.rows.first().map_or(0.0, |r| r.height) + 2.0 * self.padding
        };
        self.space_before + lead
    }
}

enum Flow {
    Block(Block),
    Space(f32),
}

// ── Text wrapping ────────────────────────────────────────────────────────

/// A styled piece of inline text ready for measuring.
#[derive(Debug, Clone)]
struct Piece {
    text: String,
    font: FontFace,
    size: f32,
    color: Color,
    href: Option<String>,
}

/// A run of text on one line, starting `x` points from the line start.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    x: f32,
    width: f32,
    text: String,
    piece: usize,
}

enum Token<'a> {
    Word(&'a str, usize),
    Space,
    Newline,
}

fn tokenize(pieces: &[Piece]) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for (index, piece) in pieces.iter().enumerate() {
        let text = piece.text.as_str();
        let mut word_start: Option<usize> = None;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                if let Some(start) = word_start.take() {
                    tokens.push(Token::Word(&text[start..i], index));
                }
                tokens.push(if c == '\n' { Token::Newline } else { Token::Space });
            } else if word_start.is_none() {
                word_start = Some(i);
            }
        }
        if let Some(start) = word_start {
            tokens.push(Token::Word(&text[start..], index));
        }
    }
    tokens
}

struct LineBuilder<'a> {
    pieces: &'a [Piece],
    width: f32,
    lines: Vec<Vec<Run>>,
    current: Vec<Run>,
    x: f32,
    pending_space: bool,
}

impl<'a> LineBuilder<'a> {
    fn new(pieces: &'a [Piece], width: f32) -> Self {
        Self {
            pieces,
            width: width.max(1.0),
            lines: Vec::new(),
            current: Vec::new(),
            x: 0.0,
            pending_space: false,
        }
    }

    fn measure(&self, piece: usize, text: &str) -> f32 {
        let p = &self.pieces[piece];
        text_width(p.font, p.size, text)
    }

    fn flush(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
        self.x = 0.0;
        self.pending_space = false;
    }

    fn append(&mut self, piece: usize, text: &str, width: f32) {
        match self.current.last_mut() {
            Some(run) if run.piece == piece => {
                run.text.push_str(text);
                run.width += width;
            }
            _ => self.current.push(Run {
                x: self.x,
                width,
                text: text.to_string(),
                piece,
            }),
        }
        self.x += width;
    }

    fn word(&mut self, word: &str, piece: usize) {
        let word_width = self.measure(piece, word);
        let space_piece = self.current.last().map(|r| r.piece);
        let space_width = match (self.pending_space, space_piece) {
            (true, Some(p)) => self.measure(p, " "),
            _ => 0.0,
        };

        if !self.current.is_empty() && self.x + space_width + word_width > self.width + EPSILON {
            self.flush();
        } else if let (true, Some(p)) = (space_width > 0.0, space_piece) {
            self.append(p, " ", space_width);
        }
        self.pending_space = false;

        if word_width <= self.width + EPSILON || !self.current.is_empty() {
            self.append(piece, word, word_width);
            return;
        }

        // A word wider than the line is broken at character boundaries.
        let mut chunk = String::new();
        let mut chunk_width = 0.0;
        for c in word.chars() {
            let w = self.measure(piece, c.encode_utf8(&mut [0; 4]));
            if !chunk.is_empty() && chunk_width + w > self.width + EPSILON {
                self.append(piece, &chunk, chunk_width);
                self.flush();
                chunk.clear();
                chunk_width = 0.0;
            }
            chunk.push(c);
            chunk_width += w;
        }
        if !chunk.is_empty() {
            self.append(piece, &chunk, chunk_width);
        }
    }

    fn finish(mut self) -> Vec<Vec<Run>> {
        if !self.current.is_empty() {
            self.flush();
        }
        self.lines
    }
}

/// Greedy line breaking of styled pieces to `width` points.
fn wrap_pieces(pieces: &[Piece], width: f32) -> Vec<Vec<Run>> {
    let mut builder = LineBuilder::new(pieces, width);
    for token in tokenize(pieces) {
        match token {
            Token::Word(word, piece) => builder.word(word, piece),
            Token::Space => builder.pending_space = !builder.current.is_empty(),
            Token::Newline => builder.flush(),
        }
    }
    builder.finish()
}

/// Break a monospace line into chunks of at most `columns` characters.
fn chunk_chars(line: &str, columns: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(columns.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

// ── Measuring ────────────────────────────────────────────────────────────

struct Measurer<'a> {
    styles: &'a StyleSheet,
    width: f32,
    height: f32,
}

impl<'a> Measurer<'a> {
    fn new(styles: &'a StyleSheet, geometry: PageGeometry) -> Self {
        Self {
            styles,
            width: geometry.content_width(),
            height: geometry.content_height(),
        }
    }

    fn measure(&self, element: &LayoutElement) -> Option<Flow> {
        let flow = match element {
            LayoutElement::Title(text) => {
                Flow::Block(self.heading(text, StyleName::Title, true))
            }
            LayoutElement::Heading { tier, text } => {
                let underline = tier.style_name() == StyleName::HeadingA;
                Flow::Block(self.heading(text, tier.style_name(), underline))
            }
            LayoutElement::Text(block) => {
                let style = self.styles.paragraph(block.style);
                let mut text = self.text_block(&block.spans, style);
                if block.style == StyleName::Quote {
                    text.decoration = Some(Decoration::Bar {
                        x: (style.left_indent - 9.0).max(0.0),
                        color: self.styles.quote_bar,
                    });
                }
                Flow::Block(text)
            }
            LayoutElement::Link { text, href } => {
                let spans = [Span::link(text.clone(), href.clone())];
                Flow::Block(self.text_block(&spans, &self.styles.link))
            }
            LayoutElement::Code(code) => Flow::Block(self.code(code)),
            LayoutElement::List(list) => Flow::Block(self.list(list)),
            LayoutElement::Table(table) => Flow::Block(self.table(table)),
            LayoutElement::Image(image) => Flow::Block(self.image(image)),
            LayoutElement::Spacer { height } => Flow::Space(*height),
            LayoutElement::Rule => {
                let mut rule = Block::new(vec![Row {
                    height: RULE_HEIGHT,
                    ops: vec![DrawOp::Line {
                        x1: 0.0,
                        y1: RULE_HEIGHT / 2.0,
                        x2: self.width,
                        y2: RULE_HEIGHT / 2.0,
                        width: 1.0,
                        color: Color::GRID,
                    }],
                }]);
                rule.breakable = false;
                rule.space_after = 4.0;
                Flow::Block(rule)
            }
        };
        match &flow {
            Flow::Block(b) if b.rows.is_empty() => None,
            _ => Some(flow),
        }
    }

    fn piece(&self, span: &Span, style: &ParagraphStyle) -> Piece {
        let (font, size, color) = match span.style {
            SpanStyle::Plain => (style.font, style.size, style.color),
            SpanStyle::Strong => (bold(style.font), style.size, style.color),
            SpanStyle::Emphasis => (italic(style.font), style.size, style.color),
            SpanStyle::Code => (
                self.styles.inline_code_font,
                style.size * 0.9,
                self.styles.inline_code_color,
            ),
            SpanStyle::Link => (style.font, style.size, Color::LINK),
        };
        Piece {
            text: span.text.clone(),
            font,
            size,
            color,
            href: span.href.clone(),
        }
    }

    /// Rows for wrapped inline text, each starting `indent` points in.
    fn text_rows(&self, pieces: &[Piece], style: &ParagraphStyle, indent: f32) -> Vec<Row> {
        let baseline = baseline(style);
        wrap_pieces(pieces, self.width - indent)
            .into_iter()
            .map(|line| {
                let mut ops = Vec::with_capacity(line.len());
                let mut links = Vec::new();
                for run in line {
                    let piece = &pieces[run.piece];
                    if let Some(href) = &piece.href {
                        links.push(DrawOp::Link {
                            x: indent + run.x,
                            y: 0.0,
                            width: run.width,
                            height: style.leading,
                            href: href.clone(),
                        });
                    }
                    ops.push(DrawOp::Text {
                        x: indent + run.x,
                        y: baseline,
                        font: piece.font,
                        size: piece.size,
                        color: piece.color,
                        text: run.text,
                    });
                }
                ops.extend(links);
                Row {
                    height: style.leading,
                    ops,
                }
            })
            .collect()
    }

    fn text_block(&self, spans: &[Span], style: &ParagraphStyle) -> Block {
        let pieces: Vec<Piece> = spans.iter().map(|s| self.piece(s, style)).collect();
        let mut block = Block::new(self.text_rows(&pieces, style, style.left_indent));
        block.space_before = style.space_before;
        block.space_after = style.space_after;
        block.min_orphan = 2;
        block.min_widow = 2;
        block
    }

    fn heading(&self, text: &str, name: StyleName, underline: bool) -> Block {
        let style = self.styles.paragraph(name);
        let mut block = self.text_block(&[Span::plain(text)], style);
        if underline && !block.rows.is_empty() {
            block.rows.push(Row {
                height: 6.0,
                ops: vec![DrawOp::Line {
                    x1: 0.0,
                    y1: 3.0,
                    x2: self.width,
                    y2: 3.0,
                    width: 0.5,
                    color: Color::GRID,
                }],
            });
        }
        block.breakable = false;
        block.keep_with_next = true;
        block
    }

    fn code(&self, code: &CodeBlock) -> Block {
        let line_style = if code.raw {
            &self.styles.code_raw
        } else {
            &self.styles.code_line
        };
        let label_style = &self.styles.code_label;
        let columns = monospace_columns(line_style.size, self.width - 2.0 * CODE_PAD_X);

        let line_row = |text: String| Row {
            height: line_style.leading,
            ops: vec![DrawOp::Text {
                x: CODE_PAD_X,
                y: baseline(line_style),
                font: line_style.font,
                size: line_style.size,
                color: line_style.color,
                text,
            }],
        };

        let mut rows = Vec::new();
        for row in &code.rows {
            match row {
                CodeRow::Label(label) => rows.push(Row {
                    height: label_style.leading,
                    ops: vec![DrawOp::Text {
                        x: CODE_PAD_X,
                        y: baseline(label_style),
                        font: label_style.font,
                        size: label_style.size,
                        color: label_style.color,
                        text: label.clone(),
                    }],
                }),
                CodeRow::Line(line) => {
                    for source_line in line.split('\n') {
                        if source_line.trim().is_empty() {
                            rows.push(Row::empty(line_style.leading));
                            continue;
                        }
                        for chunk in chunk_chars(&expand_tabs(source_line), columns) {
                            rows.push(line_row(chunk));
                        }
                    }
                }
                CodeRow::Blank => rows.push(Row::empty(line_style.leading)),
            }
        }

        let mut block = Block::new(rows);
        block.decoration = Some(Decoration::Fill(self.styles.code_background));
        block.padding = CODE_PAD_Y;
        block.min_orphan = CODE_MIN_ROWS;
        block.min_widow = CODE_MIN_ROWS;
        block.keep_whole = true;
        block
    }

    fn list(&self, list: &ListBlock) -> Block {
        let style = &self.styles.list_item;
        let label_width = list
            .items
            .iter()
            .map(|i| text_width(style.font, style.size, &i.label))
            .fold(0.0_f32, f32::max)
            + LABEL_GAP;

        let mut rows = Vec::new();
        for item in &list.items {
            let label_x = style.left_indent + item.depth as f32 * LIST_INDENT_STEP;
            let text_x = label_x + label_width.max(LIST_INDENT_STEP - LABEL_GAP);
            let pieces: Vec<Piece> = item.spans.iter().map(|s| self.piece(s, style)).collect();
            let mut item_rows = self.text_rows(&pieces, style, text_x);
            if item_rows.is_empty() {
                item_rows.push(Row::empty(style.leading));
            }
            item_rows[0].ops.insert(
                0,
                DrawOp::Text {
                    x: label_x,
                    y: baseline(style),
                    font: style.font,
                    size: style.size,
                    color: style.color,
                    text: item.label.clone(),
                },
            );
            if let Some(last) = item_rows.last_mut() {
                last.height += style.space_after;
            }
            rows.extend(item_rows);
        }

        let mut block = Block::new(rows);
        block.space_after = self.styles.body.space_after;
        block
    }

    fn table(&self, table: &TableBlock) -> Block {
        let ts = &self.styles.table;
        let leading = ts.font_size * 1.25;
        let widths = column_widths(
            table,
            ts.body_font,
            ts.header_font,
            ts.font_size,
            ts.cell_padding,
            self.width,
        );
        let total_width: f32 = widths.iter().sum();

        let rows: Vec<Row> = table
            .rows
            .iter()
            .enumerate()
            .map(|(r, cells)| {
                let header = r < table.header_rows;
                let font = if header { ts.header_font } else { ts.body_font };
                let fill = if header {
                    ts.header_background
                } else {
                    ts.body_background
                };

                let mut cell_lines = Vec::with_capacity(cells.len());
                let mut max_lines = 1;
                for (c, cell) in cells.iter().enumerate() {
                    let piece = Piece {
                        text: cell.clone(),
                        font,
                        size: ts.font_size,
                        color: Color::BLACK,
                        href: None,
                    };
                    let lines = wrap_pieces(
                        std::slice::from_ref(&piece),
                        widths[c] - 2.0 * ts.cell_padding,
                    );
                    max_lines = max_lines.max(lines.len());
                    cell_lines.push(lines);
                }
                let height = max_lines as f32 * leading + 2.0 * ts.cell_padding;

                let mut ops = vec![DrawOp::Rect {
                    x: 0.0,
                    y: 0.0,
                    width: total_width,
                    height,
                    fill,
                }];
                let mut x = 0.0;
                for (c, lines) in cell_lines.into_iter().enumerate() {
                    for (l, line) in lines.into_iter().enumerate() {
                        for run in line {
                            ops.push(DrawOp::Text {
                                x: x + ts.cell_padding + run.x,
                                y: ts.cell_padding + l as f32 * leading + ts.font_size * 0.95,
                                font,
                                size: ts.font_size,
                                color: Color::BLACK,
                                text: run.text,
                            });
                        }
                    }
                    x += widths[c];
                }
                ops.extend(grid_lines(&widths, height, ts.grid_width, ts.grid_color));
                Row { height, ops }
            })
            .collect();

        let header = rows.first().filter(|_| table.header_rows > 0).cloned();
        let mut block = Block::new(rows);
        block.header = header;
        block.min_orphan = if table.header_rows > 0 { 2 } else { 1 };
        block
    }

    fn image(&self, image: &ImageDescriptor) -> Block {
        let mut width = image.width.min(self.width);
        let mut height = image.height * (width / image.width.max(EPSILON));
        if height > self.height {
            width *= self.height / height;
            height = self.height;
        }
        let mut block = Block::new(vec![Row {
            height,
            ops: vec![DrawOp::Image {
                x: (self.width - width) / 2.0,
                y: 0.0,
                width,
                height,
                path: image.path.clone(),
            }],
        }]);
        block.breakable = false;
        block
    }
}

fn baseline(style: &ParagraphStyle) -> f32 {
    (style.leading - style.size) / 2.0 + style.size * 0.8
}

fn bold(font: FontFace) -> FontFace {
    match font {
        FontFace::Courier | FontFace::CourierBold => FontFace::CourierBold,
        _ => FontFace::HelveticaBold,
    }
}

fn italic(font: FontFace) -> FontFace {
    match font {
        FontFace::Courier | FontFace::CourierBold => font,
        _ => FontFace::HelveticaOblique,
    }
}

/// Column widths proportional to each column's widest cell, clamped to `max_width`.
fn column_widths(
    table: &TableBlock,
    body_font: FontFace,
    header_font: FontFace,
    size: f32,
    padding: f32,
    max_width: f32,
) -> Vec<f32> {
    let columns = table.column_count();
    let mut natural = vec![0.0_f32; columns];
    for (r, row) in table.rows.iter().enumerate() {
        let font = if r < table.header_rows {
            header_font
        } else {
            body_font
        };
        for (c, cell) in row.iter().enumerate() {
            let w = text_width(font, size, cell) + 2.0 * padding;
            natural[c] = natural[c].max(w.max(2.0 * padding + size));
        }
    }
    let total: f32 = natural.iter().sum();
    if total <= max_width {
        return natural;
    }
    natural.iter().map(|w| w / total * max_width).collect()
}

fn grid_lines(widths: &[f32], height: f32, width: f32, color: Color) -> Vec<DrawOp> {
    let total: f32 = widths.iter().sum();
    let mut ops = vec![
        DrawOp::Line {
            x1: 0.0,
            y1: 0.0,
            x2: total,
            y2: 0.0,
            width,
            color,
        },
        DrawOp::Line {
            x1: 0.0,
            y1: height,
            x2: total,
            y2: height,
            width,
            color,
        },
    ];
    let mut x = 0.0;
    ops.push(DrawOp::Line {
        x1: x,
        y1: 0.0,
        x2: x,
        y2: height,
        width,
        color,
    });
    for w in widths {
        x += w;
        ops.push(DrawOp::Line {
            x1: x,
            y1: 0.0,
            x2: x,
            y2: height,
            width,
            color,
        });
    }
    ops
}

// ── Placement ────────────────────────────────────────────────────────────

struct PageBuilder {
    geometry: PageGeometry,
    pages: Vec<Page>,
    current: Page,
    cursor: f32,
}

impl PageBuilder {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: Page::default(),
            cursor: 0.0,
        }
    }

    fn remaining(&self) -> f32 {
        self.geometry.content_height() - self.cursor
    }

    fn at_top(&self) -> bool {
        self.cursor <= EPSILON
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = 0.0;
    }

    fn space(&mut self, height: f32) {
        if self.at_top() {
            return;
        }
        if height >= self.remaining() {
            self.new_page();
        } else {
            self.cursor += height;
        }
    }

    /// Start a new page unless `height` fits below the cursor.
    fn keep_together(&mut self, height: f32) {
        if !self.at_top() && height > self.remaining() + EPSILON {
            self.new_page();
        }
    }

    fn place(&mut self, block: &Block) {
        if !self.at_top() {
            self.cursor += block.space_before;
        }
        let count = block.rows.len();
        let mut start = 0;
        let mut fragment = 0;
        while start < count {
            if fragment == 0 && block.keep_whole && !self.at_top() {
                let whole = block.height();
                if whole > self.remaining() + EPSILON
                    && whole <= self.geometry.content_height() + EPSILON
                {
                    self.new_page();
                    continue;
                }
            }
            let header = if fragment > 0 { block.header.as_ref() } else { None };
            let overhead = 2.0 * block.padding + header.map_or(0.0, |h| h.height);
            let heights: Vec<f32> = block.rows[start..].iter().map(|r| r.height).collect();
            let room = self.remaining() - overhead;

            let take = match decide_break(
                room,
                &heights,
                block.breakable,
                block.min_orphan,
                block.min_widow,
            ) {
                BreakDecision::Place => count - start,
                BreakDecision::Split {
                    rows_on_current_page,
                } => rows_on_current_page,
                BreakDecision::MoveToNextPage if self.at_top() => {
                    // A fresh page cannot do better: place what fits, at least one row.
                    if block.breakable {
                        fitting_rows(room, &heights).max(1)
                    } else {
                        count - start
                    }
                }
                BreakDecision::MoveToNextPage => {
                    self.new_page();
                    continue;
                }
            };

            self.draw_fragment(block, header, start..start + take);
            start += take;
            fragment += 1;
            if start < count {
                self.new_page();
            }
        }
        self.cursor += block.space_after;
    }

    fn draw_fragment(&mut self, block: &Block, header: Option<&Row>, rows: Range<usize>) {
        let dx = self.geometry.margin;
        let page_height = self.geometry.height;
        let top = self.geometry.margin + self.cursor;
        let body: f32 = block.rows[rows.clone()].iter().map(|r| r.height).sum();
        let height = body + 2.0 * block.padding + header.map_or(0.0, |h| h.height);

        match block.decoration {
            Some(Decoration::Fill(fill)) => self.current.ops.push(
                DrawOp::Rect {
                    x: 0.0,
                    y: 0.0,
                    width: self.geometry.content_width(),
                    height,
                    fill,
                }
                .placed(dx, top, page_height),
            ),
            Some(Decoration::Bar { x, color }) => self.current.ops.push(
                DrawOp::Rect {
                    x,
                    y: 0.0,
                    width: QUOTE_BAR_WIDTH,
                    height,
                    fill: color,
                }
                .placed(dx, top, page_height),
            ),
            None => {}
        }

        let mut y = block.padding;
        for row in header.into_iter().chain(block.rows[rows].iter()) {
            for op in &row.ops {
                self.current.ops.push(op.placed(dx, top + y, page_height));
            }
            y += row.height;
        }
        self.cursor += height;
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.ops.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

/// Lay out `doc` on pages of the given geometry.
///
/// Always returns at least one page.
pub fn paginate(doc: &LayoutDocument, geometry: PageGeometry) -> Vec<Page> {
    let measurer = Measurer::new(&doc.styles, geometry);
    let flows: Vec<Flow> = doc
        .elements
        .iter()
        .filter_map(|e| measurer.measure(e))
        .collect();

    let mut builder = PageBuilder::new(geometry);
    for (i, flow) in flows.iter().enumerate() {
        match flow {
            Flow::Space(height) => builder.space(*height),
            Flow::Block(block) => {
                if block.keep_with_next {
                    let next = flows[i + 1..]
                        .iter()
                        .find_map(|f| match f {
                            Flow::Block(b) => Some(b.lead_height(geometry.content_height())),
                            Flow::Space(_) => None,
                        })
                        .unwrap_or(0.0);
                    let own = block.space_before + block.height() + block.space_after;
                    builder.keep_together(own + next);
                }
                builder.place(block);
            }
        }
    }
    let pages = builder.finish();
    debug!("Laid out {} page(s)", pages.len());
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeadingTier, ListItem, TextBlock};

    fn geometry() -> PageGeometry {
        PageGeometry {
            width: 612.0,
            height: 792.0,
            margin: 72.0,
        }
    }

    fn doc(elements: Vec<LayoutElement>) -> LayoutDocument {
        LayoutDocument {
            title: None,
            elements,
            styles: StyleSheet::default(),
        }
    }

    fn code_lines(n: usize) -> LayoutElement {
        LayoutElement::Code(CodeBlock {
            language: None,
            rows: (0..n).map(|i| CodeRow::Line(format!("line {i}"))).collect(),
            raw: false,
        })
    }

    fn para(text: &str) -> LayoutElement {
        LayoutElement::Text(TextBlock::new(vec![Span::plain(text)], StyleName::Body))
    }

    fn page_of(pages: &[Page], needle: &str) -> Option<usize> {
        pages.iter().position(|p| p.texts().any(|t| t == needle))
    }

    #[test]
    fn break_decisions() {
        assert_eq!(decide_break(100.0, &[20.0, 30.0, 40.0], true, 2, 2), BreakDecision::Place);
        assert_eq!(
            decide_break(50.0, &[20.0, 30.0, 40.0], false, 2, 2),
            BreakDecision::MoveToNextPage
        );
        assert_eq!(
            decide_break(55.0, &[20.0, 30.0, 40.0], true, 1, 1),
            BreakDecision::Split {
                rows_on_current_page: 2
            }
        );
        // One row would be stranded at the bottom.
        assert_eq!(
            decide_break(25.0, &[20.0, 30.0, 40.0], true, 2, 2),
            BreakDecision::MoveToNextPage
        );
        // One row would be stranded at the top of the next page.
        assert_eq!(
            decide_break(70.0, &[20.0; 4], true, 2, 2),
            BreakDecision::Split {
                rows_on_current_page: 2
            }
        );
    }

    #[test]
    fn widow_pullback_respects_orphans() {
        // 2 of 3 fit; pulling one back would leave a lone orphan.
        assert_eq!(
            decide_break(45.0, &[20.0; 3], true, 2, 2),
            BreakDecision::MoveToNextPage
        );
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let piece = Piece {
            text: "aaa bbb ccc".into(),
            font: FontFace::Courier,
            size: 10.0,
            color: Color::BLACK,
            href: None,
        };
        // 6pt per glyph: "aaa bbb" is 42pt.
        let lines = wrap_pieces(std::slice::from_ref(&piece), 45.0);
        let texts: Vec<String> = lines
            .iter()
            .map(|l| l.iter().map(|r| r.text.as_str()).collect())
            .collect();
        assert_eq!(texts, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn long_words_are_broken() {
        let piece = Piece {
            text: "abcdefghij".into(),
            font: FontFace::Courier,
            size: 10.0,
            color: Color::BLACK,
            href: None,
        };
        let lines = wrap_pieces(std::slice::from_ref(&piece), 24.0);
        let texts: Vec<String> = lines.iter().map(|l| l[0].text.clone()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_document_has_one_blank_page() {
        let pages = paginate(&doc(vec![]), geometry());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].ops.is_empty());
    }

    #[test]
    fn every_element_lands_on_a_page() {
        let elements: Vec<_> = (0..200).map(|i| para(&format!("paragraph {i}"))).collect();
        let pages = paginate(&doc(elements), geometry());
        assert!(pages.len() > 1);
        for i in 0..200 {
            assert!(page_of(&pages, &format!("paragraph {i}")).is_some(), "lost {i}");
        }
    }

    #[test]
    fn short_code_block_is_not_split() {
        // Fill most of the first page, then add a 10-line block.
        let mut elements: Vec<_> = (0..42).map(|i| para(&format!("p{i}"))).collect();
        elements.push(code_lines(10));
        let pages = paginate(&doc(elements), geometry());
        let first = page_of(&pages, "line 0").unwrap();
        let last = page_of(&pages, "line 9").unwrap();
        assert_eq!(first, last);
    }

    #[test]
    fn long_code_block_has_no_stranded_rows() {
        for lead in 0..45 {
            let mut elements: Vec<_> = (0..lead).map(|i| para(&format!("p{i}"))).collect();
            elements.push(code_lines(120));
            let pages = paginate(&doc(elements), geometry());
            for page in &pages {
                let rows = page.texts().filter(|t| t.starts_with("line ")).count();
                assert!(rows == 0 || rows >= CODE_MIN_ROWS, "lead {lead}: page with {rows} row");
            }
            for i in 0..120 {
                assert!(page_of(&pages, &format!("line {i}")).is_some());
            }
        }
    }

    #[test]
    fn heading_moves_with_following_block() {
        let mut elements: Vec<_> = (0..44).map(|i| para(&format!("p{i}"))).collect();
        elements.push(LayoutElement::Heading {
            tier: HeadingTier::B,
            text: "Section".into(),
        });
        elements.push(code_lines(20));
        let pages = paginate(&doc(elements), geometry());
        assert_eq!(page_of(&pages, "Section"), page_of(&pages, "line 0"));
    }

    #[test]
    fn table_header_repeats_on_continuation() {
        let mut rows = vec![vec!["Name".to_string(), "Value".to_string()]];
        rows.extend((0..80).map(|i| vec![format!("row {i}"), i.to_string()]));
        let table = LayoutElement::Table(TableBlock {
            rows,
            header_rows: 1,
        });
        let pages = paginate(&doc(vec![table]), geometry());
        assert!(pages.len() > 1);
        for page in &pages {
            assert_eq!(page.texts().next(), Some("Name"));
        }
        for i in 0..80 {
            assert!(page_of(&pages, &format!("row {i}")).is_some());
        }
    }

    #[test]
    fn links_get_clickable_areas() {
        let el = LayoutElement::Link {
            text: "docs".into(),
            href: Some("https://example.com".into()),
        };
        let pages = paginate(&doc(vec![el]), geometry());
        assert!(pages[0]
            .ops
            .iter()
            .any(|op| matches!(op, DrawOp::Link { href, .. } if href == "https://example.com")));
    }

    #[test]
    fn list_labels_are_drawn() {
        let list = LayoutElement::List(ListBlock {
            ordered: true,
            items: vec![
                ListItem {
                    label: "1.".into(),
                    spans: vec![Span::plain("a")],
                    depth: 0,
                },
                ListItem {
                    label: "2.".into(),
                    spans: vec![Span::plain("b")],
                    depth: 0,
                },
            ],
        });
        let pages = paginate(&doc(vec![list]), geometry());
        let texts: Vec<_> = pages[0].texts().collect();
        assert_eq!(texts, vec!["1.", "a", "2.", "b"]);
    }

    #[test]
    fn text_starts_inside_top_margin() {
        let pages = paginate(&doc(vec![para("hello")]), geometry());
        let Some(DrawOp::Text { x, y, .. }) = pages[0].ops.first() else {
            panic!("expected text");
        };
        assert_eq!(*x, 72.0);
        assert!(*y < 792.0 - 72.0 && *y > 792.0 - 72.0 - 20.0);
    }

    #[test]
    fn oversized_image_is_shrunk_to_page() {
        let image = LayoutElement::Image(ImageDescriptor {
            path: PathBuf::from("tall.png"),
            intrinsic: Some((300, 2000)),
            width: 300.0,
            height: 2000.0,
        });
        let pages = paginate(&doc(vec![image]), geometry());
        let Some(DrawOp::Image { height, .. }) = pages[0].ops.first() else {
            panic!("expected image");
        };
        assert!(*height <= 648.0 + EPSILON);
    }
}
