//! Standard-14 font metrics and WinAnsi text encoding.
//!
//! Widths are in 1/1000 em, taken from the Adobe AFM files for the printable
//! ASCII range. Characters outside it use the width of `n`-sized glyphs,
//! which is close enough for line breaking.

use crate::model::FontFace;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // 0-9
    278, 278, 584, 584, 584, 556, 1015,                                             // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // N-Z
    278, 278, 278, 469, 556, 333,                                                   // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // n-z
    334, 260, 334, 584,                                                             // {..~
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const COURIER: u16 = 600;
const FALLBACK: u16 = 556;

/// Spaces a tab expands to in code.
pub const TAB_WIDTH: usize = 4;

/// Glyph width of `c` in 1/1000 em.
pub fn char_width(font: FontFace, c: char) -> u16 {
    let table = match font {
        FontFace::Courier | FontFace::CourierBold => return COURIER,
        FontFace::Helvetica | FontFace::HelveticaOblique => &HELVETICA,
        FontFace::HelveticaBold => &HELVETICA_BOLD,
    };
    match u32::from(c) {
        code @ 32..=126 => table[(code - 32) as usize],
        _ => FALLBACK,
    }
}

/// Width of `text` set in `font` at `size` points.
pub fn text_width(font: FontFace, size: f32, text: &str) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(font, c))).sum();
    units as f32 * size / 1000.0
}

/// Characters of a monospace font that fit in `width` points.
pub fn monospace_columns(size: f32, width: f32) -> usize {
    let advance = f32::from(COURIER) * size / 1000.0;
    ((width / advance).floor() as usize).max(1)
}

/// Replace tabs with spaces.
pub fn expand_tabs(text: &str) -> String {
    if !text.contains('\t') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut column = 0;
    for c in text.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - column % TAB_WIDTH;
            out.push_str(&" ".repeat(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Map a character to its WinAnsiEncoding byte.
pub fn winansi(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20}'..='\u{7e}' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u8,
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// Encode text for a WinAnsi font. Unmappable characters become `?`.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| winansi(c).unwrap_or(b'?')).collect()
}
