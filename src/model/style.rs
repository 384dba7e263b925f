//! The style table returned alongside the layout elements.

use serde::{Deserialize, Serialize};

/// Name of a paragraph style in the [`StyleSheet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StyleName {
    Title,
    HeadingA,
    HeadingB,
    HeadingC,
    Body,
    Quote,
    ListItem,
    Link,
    CodeLine,
    CodeLabel,
    /// Unsplit preformatted text without a `code` child.
    CodeRaw,
    Placeholder,
}

/// The five standard PDF fonts the layout backend draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FontFace {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    Courier,
    CourierBold,
}

impl FontFace {
    /// PostScript base font name.
    pub fn base_name(self) -> &'static str {
        match self {
            FontFace::Helvetica => "Helvetica",
            FontFace::HelveticaBold => "Helvetica-Bold",
            FontFace::HelveticaOblique => "Helvetica-Oblique",
            FontFace::Courier => "Courier",
            FontFace::CourierBold => "Courier-Bold",
        }
    }

    /// Resource name used in page content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            FontFace::Helvetica => "F1",
            FontFace::HelveticaBold => "F2",
            FontFace::HelveticaOblique => "F3",
            FontFace::Courier => "F4",
            FontFace::CourierBold => "F5",
        }
    }

    pub fn is_monospace(self) -> bool {
        matches!(self, FontFace::Courier | FontFace::CourierBold)
    }

    pub const ALL: [FontFace; 5] = [
        FontFace::Helvetica,
        FontFace::HelveticaBold,
        FontFace::HelveticaOblique,
        FontFace::Courier,
        FontFace::CourierBold,
    ];
}

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0x24, 0x29, 0x2e);
    pub const WHITE: Color = Color(0xff, 0xff, 0xff);
    pub const GREY: Color = Color(0x6a, 0x73, 0x7d);
    pub const LINK: Color = Color(0x03, 0x66, 0xd6);
    pub const CODE_ACCENT: Color = Color(0xd7, 0x3a, 0x49);
    pub const CODE_BACKGROUND: Color = Color(0xf6, 0xf8, 0xfa);
    pub const GRID: Color = Color(0xd0, 0xd7, 0xde);
    pub const QUOTE_BAR: Color = Color(0xdf, 0xe2, 0xe5);

    /// Components scaled to 0.0–1.0 for PDF colour operators.
    pub fn to_unit(self) -> [f32; 3] {
        [
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        ]
    }

    /// `#rrggbb` notation for CSS.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Typography and spacing for one kind of text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    pub font: FontFace,
    pub size: f32,
    pub leading: f32,
    pub color: Color,
    pub space_before: f32,
    pub space_after: f32,
    pub left_indent: f32,
}

impl ParagraphStyle {
    fn new(font: FontFace, size: f32, color: Color) -> Self {
        Self {
            font,
            size,
            leading: size * 1.3,
            color,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
        }
    }

    fn spacing(mut self, before: f32, after: f32) -> Self {
        self.space_before = before;
        self.space_after = after;
        self
    }

    fn indent(mut self, left: f32) -> Self {
        self.left_indent = left;
        self
    }

    fn leading(mut self, leading: f32) -> Self {
        self.leading = leading;
        self
    }
}

/// Fixed visual style shared by every table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStyle {
    pub header_font: FontFace,
    pub body_font: FontFace,
    pub font_size: f32,
    pub header_background: Color,
    pub body_background: Color,
    pub grid_color: Color,
    pub grid_width: f32,
    pub cell_padding: f32,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            header_font: FontFace::HelveticaBold,
            body_font: FontFace::Helvetica,
            font_size: 9.5,
            header_background: Color::CODE_BACKGROUND,
            body_background: Color::WHITE,
            grid_color: Color::GRID,
            grid_width: 0.5,
            cell_padding: 4.0,
        }
    }
}

/// Every style the renderer needs to draw a [`crate::model::LayoutDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub title: ParagraphStyle,
    pub heading_a: ParagraphStyle,
    pub heading_b: ParagraphStyle,
    pub heading_c: ParagraphStyle,
    pub body: ParagraphStyle,
    pub quote: ParagraphStyle,
    pub list_item: ParagraphStyle,
    pub link: ParagraphStyle,
    pub code_line: ParagraphStyle,
    pub code_label: ParagraphStyle,
    pub code_raw: ParagraphStyle,
    pub placeholder: ParagraphStyle,
    pub table: TableStyle,
    /// Font and colour of inline code spans inside text.
    pub inline_code_font: FontFace,
    pub inline_code_color: Color,
    pub code_background: Color,
    pub quote_bar: Color,
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self {
            title: ParagraphStyle::new(FontFace::HelveticaBold, 24.0, Color::BLACK)
                .spacing(0.0, 18.0),
            heading_a: ParagraphStyle::new(FontFace::HelveticaBold, 18.0, Color::BLACK)
                .spacing(18.0, 10.0),
            heading_b: ParagraphStyle::new(FontFace::HelveticaBold, 14.0, Color::BLACK)
                .spacing(14.0, 8.0),
            heading_c: ParagraphStyle::new(FontFace::HelveticaBold, 12.0, Color::BLACK)
                .spacing(12.0, 6.0),
            body: ParagraphStyle::new(FontFace::Helvetica, 10.5, Color::BLACK).spacing(0.0, 8.0),
            quote: ParagraphStyle::new(FontFace::Helvetica, 10.5, Color::GREY)
                .spacing(0.0, 8.0)
                .indent(14.0),
            list_item: ParagraphStyle::new(FontFace::Helvetica, 10.5, Color::BLACK)
                .spacing(0.0, 3.0)
                .indent(12.0),
            link: ParagraphStyle::new(FontFace::Helvetica, 10.5, Color::LINK).spacing(0.0, 8.0),
            code_line: ParagraphStyle::new(FontFace::Courier, 9.0, Color::BLACK).leading(11.5),
            code_label: ParagraphStyle::new(FontFace::HelveticaBold, 7.5, Color::GREY)
                .leading(11.5),
            code_raw: ParagraphStyle::new(FontFace::Courier, 9.0, Color::BLACK).leading(11.5),
            placeholder: ParagraphStyle::new(FontFace::HelveticaOblique, 10.0, Color::GREY)
                .spacing(0.0, 8.0),
            table: TableStyle::default(),
            inline_code_font: FontFace::Courier,
            inline_code_color: Color::CODE_ACCENT,
            code_background: Color::CODE_BACKGROUND,
            quote_bar: Color::QUOTE_BAR,
        }
    }
}

impl StyleSheet {
    pub fn paragraph(&self, name: StyleName) -> &ParagraphStyle {
        match name {
            StyleName::Title => &self.title,
            StyleName::HeadingA => &self.heading_a,
            StyleName::HeadingB => &self.heading_b,
            StyleName::HeadingC => &self.heading_c,
            StyleName::Body => &self.body,
            StyleName::Quote => &self.quote,
            StyleName::ListItem => &self.list_item,
            StyleName::Link => &self.link,
            StyleName::CodeLine => &self.code_line,
            StyleName::CodeLabel => &self.code_label,
            StyleName::CodeRaw => &self.code_raw,
            StyleName::Placeholder => &self.placeholder,
        }
    }
}
