//! Splitting of `;`-separated SQL scripts.
//!
//! This is a display-grade lexer, not a SQL parser: comments and
//! dialect-specific quoting are not understood.

use crate::dialect::Dialect;
use std::collections::HashMap;

const DELIMITER: char = ';';
const ESCAPE: char = '\\';

/// Quote characters relevant for scripts of the given dialect.
pub fn dialect_quote_chars(dialect: &dyn Dialect) -> Vec<char> {
    vec![
        '"',
        '\'',
        dialect.string_quote_char(),
        dialect.identifier_quote_char(),
    ]
}

/// Split `blob` on every `;` that is outside all quotes and not preceded by a
/// backslash. Statement text is kept verbatim, and whatever follows the last
/// delimiter is returned as the final (possibly empty) element.
///
/// Each quote character has its own open/closed state, so a `'` inside a
/// `"..."` section still toggles the single-quote state.
pub fn split_statements(blob: &str, quote_chars: &[char]) -> Vec<String> {
    let mut quoting: HashMap<char, bool> = quote_chars.iter().map(|&c| (c, false)).collect();
    let mut escaping = false;
    let mut start = 0;
    let mut result = Vec::new();

    for (i, c) in blob.char_indices() {
        if escaping {
            escaping = false;
            continue;
        }
        if c == ESCAPE {
            escaping = true;
            continue;
        }
        if let Some(open) = quoting.get_mut(&c) {
            *open = !*open;
            continue;
        }
        if c == DELIMITER && quoting.values().all(|open| !open) {
            result.push(blob[start..i].to_string());
            start = i + c.len_utf8();
        }
    }
    result.push(blob[start..].to_string());
    result
}
