//! Metrics and encoding for the two standard-14 faces the report uses.
//! Text is written as single-byte WinAnsi strings, so the normalizer must
//! have reduced it to Latin-1 beforehand.

use pdf_writer::Name;

/// Points per millimetre.
pub const MM_TO_PT: f32 = 72.0 / 25.4;

const REPLACEMENT: u8 = b'?';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    pub const fn ordered() -> [Font; 2] {
        [Font::Regular, Font::Bold]
    }

    /// Resource name inside each page's font dictionary.
    pub const fn resource_name(self) -> Name<'static> {
        match self {
            Font::Regular => Name(b"F1"),
            Font::Bold => Name(b"F2"),
        }
    }

    pub const fn base_font(self) -> Name<'static> {
        match self {
            Font::Regular => Name(b"Helvetica"),
            Font::Bold => Name(b"Helvetica-Bold"),
        }
    }

    fn glyph_width(self, code: u8) -> u16 {
        let (ascii, latin1) = match self {
            Font::Regular => (&REGULAR_ASCII, &REGULAR_LATIN1),
            Font::Bold => (&BOLD_ASCII, &BOLD_LATIN1),
        };
        match code {
            32..=126 => ascii[usize::from(code - 32)],
            160..=255 => latin1[usize::from(code - 160)],
            _ => ascii[usize::from(REPLACEMENT - 32)],
        }
    }
}

/// Maps one character to its WinAnsi byte. Anything the encoding does not
/// share with Latin-1 becomes `?`.
pub fn encode_char(ch: char) -> u8 {
    match ch as u32 {
        code @ (32..=126 | 160..=255) => code as u8,
        _ => REPLACEMENT,
    }
}

pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}

/// Rendered width of `text` in millimetres.
pub fn text_width_mm(text: &str, font: Font, size_pt: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|ch| u32::from(font.glyph_width(encode_char(ch))))
        .sum();
    units as f32 / 1000.0 * size_pt / MM_TO_PT
}

/// Font size converted to millimetres.
pub fn size_mm(size_pt: f32) -> f32 {
    size_pt / MM_TO_PT
}

// Advance widths in 1/1000 em for codes 32..=126 and 160..=255.
const REGULAR_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];
const REGULAR_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];
const BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
const BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_latin1_and_replaces_the_rest() {
        assert_eq!(encode_winansi("Día ñ"), vec![b'D', 0xed, b'a', b' ', 0xf1]);
        assert_eq!(encode_winansi("a\u{2014}b\u{85}"), b"a?b?".to_vec());
    }

    #[test]
    fn measures_known_strings() {
        // "Hello" in Helvetica is 722+556+222+222+556 = 2278 units.
        let width = text_width_mm("Hello", Font::Regular, 10.0);
        let expected = 2.278 * 10.0 / MM_TO_PT;
        assert!((width - expected).abs() < 1e-4, "{width} vs {expected}");
    }

    #[test]
    fn bold_is_never_narrower_for_letters() {
        for ch in ('a'..='z').chain('A'..='Z') {
            let text = ch.to_string();
            assert!(
                text_width_mm(&text, Font::Bold, 8.0) >= text_width_mm(&text, Font::Regular, 8.0),
                "{ch}"
            );
        }
    }

    #[test]
    fn accented_letters_match_their_base_width() {
        assert_eq!(
            text_width_mm("é", Font::Regular, 9.0),
            text_width_mm("e", Font::Regular, 9.0)
        );
        assert_eq!(
            text_width_mm("Ó", Font::Bold, 9.0),
            text_width_mm("O", Font::Bold, 9.0)
        );
    }
}
