//! Reduces arbitrary text to the Latin-1 repertoire the PDF's built-in
//! fonts can encode. Both entry points are idempotent.

use unicode_normalization::UnicodeNormalization;

/// Single-line form: every run of whitespace, line breaks included,
/// becomes one space.
pub fn normalize_text(value: &str) -> String {
    sanitize(value).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Paragraph form: keeps line breaks, collapses spaces inside each line and
/// never leaves more than one blank line between paragraphs.
pub fn normalize_paragraphs(value: &str) -> String {
    let sanitized = sanitize(value);
    let mut lines: Vec<String> = Vec::new();

    for line in sanitized.split('\n') {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        let previous_blank = lines.last().map_or(true, |last| last.is_empty());
        if collapsed.is_empty() && previous_blank {
            continue;
        }
        lines.push(collapsed);
    }

    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.nfc() {
        push_sanitized(&mut out, ch);
    }
    out
}

fn push_sanitized(out: &mut String, ch: char) {
    match ch {
        '\n' => out.push('\n'),
        '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' | '\u{a0}' | '\t' | '\r' => {
            out.push(' ')
        }
        '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2022}' | '\u{2219}' | '\u{b7}' => out.push('-'),
        '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' => out.push('"'),
        '\u{2018}' | '\u{2019}' | '\u{b4}' | '`' => out.push('\''),
        '\u{2026}' => out.push_str("..."),
        '\u{a8}' | '\u{b6}' | '\u{ad}' => {}
        c if c.is_control() => out.push(' '),
        c if (c as u32) <= 0xff => out.push(c),
        c => {
            // Compatibility decomposition keeps the Latin-1 base of letters
            // such as `ő` or ligatures such as `ﬁ`; marks and emoji vanish.
            for part in c.nfkd() {
                if (part as u32) <= 0xff {
                    push_sanitized(out, part);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sanitize_for_tests(value: &str) -> String {
    sanitize(value)
}
