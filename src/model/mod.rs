//! Document data model: the parsed [`ContentNode`] tree going into the
//! layout mapper and the [`LayoutElement`] sequence coming out of it.

pub mod layout;
pub mod node;
pub mod style;

pub use layout::{
    CodeBlock, CodeRow, HeadingTier, ImageDescriptor, LayoutDocument, LayoutElement, ListBlock,
    ListItem, Span, SpanStyle, TableBlock, TextBlock,
};
pub use node::{ContentNode, NodeKind};
pub use style::{Color, FontFace, ParagraphStyle, StyleName, StyleSheet, TableStyle};
