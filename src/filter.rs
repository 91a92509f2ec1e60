//! Table include/exclude filtering shared by schema and row diffing

use crate::error::Result;
use regex::{Regex, RegexBuilder};

/// Outcome of checking a table name against include/exclude patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    Included,
    ExcludedByInclude,
    ExcludedByExclude,
}

impl FilterResult {
    pub fn is_included(self) -> bool {
        self == Self::Included
    }
}

/// One user-supplied pattern entry: a comma-separated list of regexes, any of
/// which may match.
#[derive(Debug, Clone)]
struct PatternEntry {
    alternatives: Vec<Regex>,
}

impl PatternEntry {
    fn parse(entry: &str) -> Result<Self> {
        let alternatives = entry
            .split(',')
            .map(|part| {
                RegexBuilder::new(part.trim())
                    .case_insensitive(true)
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    fn matches(&self, name: &str) -> bool {
        self.alternatives.iter().any(|re| re.is_match(name))
    }
}

/// Compiled include/exclude patterns
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    includes: Vec<PatternEntry>,
    excludes: Vec<PatternEntry>,
}

impl TableFilter {
    /// Compile the pattern entries. An invalid regular expression is an error.
    pub fn new<I, E>(includes: &[I], excludes: &[E]) -> Result<Self>
    where
        I: AsRef<str>,
        E: AsRef<str>,
    {
        Ok(Self {
            includes: includes
                .iter()
                .map(|e| PatternEntry::parse(e.as_ref()))
                .collect::<Result<_>>()?,
            excludes: excludes
                .iter()
                .map(|e| PatternEntry::parse(e.as_ref()))
                .collect::<Result<_>>()?,
        })
    }

    /// Classify a table name. Patterns are unanchored and case-insensitive;
    /// the include check runs first.
    pub fn check(&self, table_name: &str) -> FilterResult {
        if !self.includes.is_empty() && !self.includes.iter().any(|e| e.matches(table_name)) {
            return FilterResult::ExcludedByInclude;
        }
        if self.excludes.iter().any(|e| e.matches(table_name)) {
            return FilterResult::ExcludedByExclude;
        }
        FilterResult::Included
    }
}

/// One-shot form of [`TableFilter::check`].
pub fn filter_table<I, E>(table_name: &str, includes: &[I], excludes: &[E]) -> Result<FilterResult>
where
    I: AsRef<str>,
    E: AsRef<str>,
{
    Ok(TableFilter::new(includes, excludes)?.check(table_name))
}
