//! Per-table scoping of user-supplied WHERE fragments and ignore columns.
//!
//! Scoping is textual: identifiers are picked out of each fragment with a
//! regular expression, not by parsing SQL. Fragments whose string literals
//! happen to contain dotted identifiers may be kept or dropped unexpectedly.

use crate::error::Result;
use crate::schema::Table;
use regex::{Regex, RegexBuilder};

/// Predicate used when no fragment applies to a table
pub const TAUTOLOGY: &str = "TRUE";

/// Quote characters stripped from ignore-column entries
const IGNORE_QUOTES: &[char] = &['`', '"', '[', ']'];

fn identifier_pattern(ident_quote: char) -> Result<Regex> {
    let q = format!("{}?", regex::escape(&ident_quote.to_string()));
    let ident = format!("{q}([_a-z][_a-z0-9]*){q}");
    Ok(RegexBuilder::new(&format!(r"(?:{ident}\.)?{ident}"))
        .case_insensitive(true)
        .build()?)
}

/// Effective filter for `table`: every fragment that names one of the table's
/// columns (bare or qualified with the table name), joined with `AND`.
/// Returns [`TAUTOLOGY`] when nothing applies.
///
/// With several fragments each one is parenthesised, so an `OR` inside a
/// fragment stays inside it.
pub fn parse_condition<S: AsRef<str>>(
    table: &Table,
    fragments: &[S],
    ident_quote: char,
) -> Result<String> {
    let pattern = identifier_pattern(ident_quote)?;

    let kept: Vec<&str> = fragments
        .iter()
        .map(|f| f.as_ref())
        .filter(|fragment| {
            pattern.captures_iter(fragment).any(|caps| {
                let qualifier = caps.get(1).map_or(table.name.as_str(), |m| m.as_str());
                let column = caps.get(2).map_or("", |m| m.as_str());
                qualifier == table.name && table.has_column(column)
            })
        })
        .collect();

    match kept.as_slice() {
        [] => Ok(TAUTOLOGY.to_string()),
        [only] => Ok(only.to_string()),
        many => Ok(many
            .iter()
            .map(|fragment| format!("({})", fragment))
            .collect::<Vec<_>>()
            .join(" AND ")),
    }
}

/// Columns of `table` named by the ignore entries. `table.column` entries
/// only apply to that table; bare entries apply everywhere. Primary key
/// columns and unknown columns are never returned.
pub fn resolve_ignore_columns<S: AsRef<str>>(table: &Table, ignores: &[S]) -> Vec<String> {
    let primary = table.primary_key_columns().unwrap_or_default();
    let mut columns: Vec<String> = Vec::new();

    for entry in ignores {
        let entry = entry.as_ref().trim();
        let (qualifier, column) = match entry.split_once('.') {
            Some((q, c)) => (strip_quotes(q), strip_quotes(c)),
            None => (table.name.clone(), strip_quotes(entry)),
        };
        if qualifier != table.name
            || !table.has_column(&column)
            || primary.contains(&column)
            || columns.contains(&column)
        {
            continue;
        }
        columns.push(column);
    }
    columns
}

fn strip_quotes(s: &str) -> String {
    s.trim().chars().filter(|c| !IGNORE_QUOTES.contains(c)).collect()
}
