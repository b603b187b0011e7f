//! Nepali text normalization
//!
//! Front-end cleaning applied before text reaches the acoustic model.
//! Steps run in a fixed order over the whole string:
//!
//! 1. Unicode NFKC
//! 2. (optional) rare letter folding: `ॠ` → `ऋ`, `॥` → `।`
//! 3. Typographic quotes and dashes → ASCII
//! 4. Zero-width / non-printing marks removed (ZWNJ, ZWJ, word joiner, BOM)
//! 5. ASCII letters lowercased; Devanagari and all other non-ASCII untouched
//! 6. Whitespace runs collapsed to one space, ends trimmed
//! 7. (optional) a danda appended when no terminal mark is present
//!
//! Normalization is total: it never fails, and blank input yields an
//! empty string.

use unicode_normalization::UnicodeNormalization;

/// Devanagari full stop
pub const DANDA: char = '।';

/// Devanagari double full stop
pub const DOUBLE_DANDA: char = '॥';

const ZERO_WIDTH: [char; 4] = ['\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

const TERMINATORS: [char; 5] = [DANDA, DOUBLE_DANDA, '.', '?', '!'];

/// Configurable normalizer
///
/// The canonical rule set folds rare letters (`fold_rare_characters = true`).
/// The non-folding variant is kept selectable so both behaviours stay
/// covered by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNormalizer {
    pub fold_rare_characters: bool,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            fold_rare_characters: true,
        }
    }
}

impl TextNormalizer {
    pub fn new(fold_rare_characters: bool) -> Self {
        Self {
            fold_rare_characters,
        }
    }

    /// Normalize `text`, appending a danda when `add_terminator` is set and
    /// the result has no terminal punctuation.
    pub fn normalize(&self, text: &str, add_terminator: bool) -> String {
        let mut out = String::with_capacity(text.len());

        for c in text.nfkc() {
            let c = if self.fold_rare_characters {
                fold_rare(c)
            } else {
                c
            };
            let c = fold_typography(c);

            if ZERO_WIDTH.contains(&c) {
                continue;
            }

            out.push(c.to_ascii_lowercase());
        }

        let mut out = collapse_whitespace(&out);

        if add_terminator && !out.is_empty() && !out.ends_with(&TERMINATORS[..]) {
            out.push(DANDA);
        }

        out
    }
}

/// Normalize with the canonical rule set
pub fn normalize(text: &str, add_terminator: bool) -> String {
    TextNormalizer::default().normalize(text, add_terminator)
}

fn fold_rare(c: char) -> char {
    match c {
        'ॠ' => 'ऋ',
        DOUBLE_DANDA => DANDA,
        other => other,
    }
}

fn fold_typography(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{201C}' | '\u{201D}' => '"',
        '\u{2013}' | '\u{2014}' => '-',
        other => other,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
