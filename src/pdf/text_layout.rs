//! Pure line-breaking and measurement. Both the canvas and the row planner
//! call into these functions, so the height a row reserves is exactly the
//! height its text later occupies.

use super::fonts::{text_width_mm, Font};

/// Horizontal inset applied on both sides of a cell's text.
pub const CELL_PADDING: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    pub text: String,
    /// Last line of its paragraph; justified text leaves these ragged.
    pub paragraph_end: bool,
}

/// Greedy word wrap inside `width` millimetres, padding included. Explicit
/// `\n` starts a new paragraph; words wider than the line are split between
/// characters.
pub fn wrap_text(text: &str, font: Font, size_pt: f32, width: f32) -> Vec<WrappedLine> {
    let available = (width - 2.0 * CELL_PADDING).max(0.0);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let start = lines.len();
        let mut current = String::new();

        for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if text_width_mm(&candidate, font, size_pt) <= available {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(line(std::mem::take(&mut current)));
            }

            if text_width_mm(word, font, size_pt) <= available {
                current = word.to_string();
            } else {
                let mut pieces = split_word(word, font, size_pt, available);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces.into_iter().map(line));
            }
        }

        if !current.is_empty() || lines.len() == start {
            lines.push(line(current));
        }
        if let Some(last) = lines.last_mut() {
            last.paragraph_end = true;
        }
    }

    lines
}

/// Number of lines `text` wraps to; empty text still occupies one line.
pub fn line_count(text: &str, font: Font, size_pt: f32, width: f32) -> usize {
    wrap_text(text, font, size_pt, width).len().max(1)
}

pub fn measure_height(text: &str, font: Font, size_pt: f32, width: f32, line_height: f32) -> f32 {
    line_count(text, font, size_pt, width) as f32 * line_height
}

fn line(text: String) -> WrappedLine {
    WrappedLine {
        text,
        paragraph_end: false,
    }
}

fn split_word(word: &str, font: Font, size_pt: f32, available: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for ch in word.chars() {
        current.push(ch);
        if current.chars().count() > 1 && text_width_mm(&current, font, size_pt) > available {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    pieces.push(current);
    pieces
}
