//! Per-table row access and DML generation.
//!
//! A [`TableScanner`] reads one table on one connection. Only primary key
//! columns are loaded in full; complete rows are fetched page by page for the
//! key tuples that actually need a statement.

use crate::connection::{Connection, TextRow};
use crate::condition::{parse_condition, resolve_ignore_columns};
use crate::dialect::Dialect;
use crate::error::{MigrationError, Result};
use crate::schema::Table;
use crate::{DEFAULT_COMMENT_WIDTH, DEFAULT_PAGE_SIZE};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Ordered primary key values of one row
pub type KeyTuple = Vec<Option<String>>;

/// Primary key tuples keyed by their identity string, in primary key order
pub type PrimaryRows = IndexMap<String, KeyTuple>;

/// A full row: column name to text value, in table column order
pub type Record = IndexMap<String, Option<String>>;

/// Key padding never exceeds this many characters
const MAX_KEY_PADDING: usize = 32;

const ELLIPSIS: &str = "...";

/// Identity of a key tuple: values joined by tabs, NULL rendered as empty.
pub fn tuple_key(tuple: &[Option<String>]) -> String {
    tuple
        .iter()
        .map(|v| v.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\t")
}

/// Row reader and statement generator for one table on one connection
pub struct TableScanner<'a> {
    conn: &'a dyn Connection,
    table: &'a Table,
    quoted_name: String,
    primary_keys: Vec<String>,
    columns: Vec<String>,
    filter_condition: String,
    ignore_columns: Vec<String>,
    page_size: usize,
    comment_width: usize,
}

impl<'a> TableScanner<'a> {
    /// Fails with `NoPrimaryKey` when the table has no primary key.
    pub fn new<W, I>(
        conn: &'a dyn Connection,
        table: &'a Table,
        filter_conditions: &[W],
        ignore_columns: &[I],
    ) -> Result<Self>
    where
        W: AsRef<str>,
        I: AsRef<str>,
    {
        let primary_keys = match table.primary_key_columns() {
            Some(columns) if !columns.is_empty() => columns.to_vec(),
            _ => return Err(MigrationError::no_primary_key(&table.name)),
        };
        let dialect = conn.dialect();

        Ok(Self {
            conn,
            table,
            quoted_name: dialect.quote_identifier(&table.name),
            primary_keys,
            columns: table.columns.keys().cloned().collect(),
            filter_condition: parse_condition(
                table,
                filter_conditions,
                dialect.identifier_quote_char(),
            )?,
            ignore_columns: resolve_ignore_columns(table, ignore_columns),
            page_size: DEFAULT_PAGE_SIZE,
            comment_width: DEFAULT_COMMENT_WIDTH,
        })
    }

    /// Number of key tuples fetched per query. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Display width of values shown in comment blocks.
    pub fn with_comment_width(mut self, width: usize) -> Self {
        self.comment_width = width.max(ELLIPSIS.len() + 1);
        self
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Effective filter after table scoping
    pub fn filter_condition(&self) -> &str {
        &self.filter_condition
    }

    pub fn ignore_columns(&self) -> &[String] {
        &self.ignore_columns
    }

    fn dialect(&self) -> &dyn Dialect {
        self.conn.dialect()
    }

    /// Whether rows of `other` can be compared with rows of this table:
    /// same primary key columns in the same order, same column names, and the
    /// same logical type for every column.
    pub fn equals(&self, other: &TableScanner<'_>) -> bool {
        if self.primary_key_string() != other.primary_key_string() {
            return false;
        }

        let mine: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.columns.iter().map(String::as_str).collect();
        if mine != theirs {
            return false;
        }

        self.table.columns.iter().all(|(name, column)| {
            other
                .table
                .column(name)
                .map_or(false, |that| column.type_equals(that))
        })
    }

    /// Why [`equals`](Self::equals) failed, for error reporting.
    pub fn mismatch_reason(&self, other: &TableScanner<'_>) -> Option<String> {
        if self.primary_key_string() != other.primary_key_string() {
            return Some(format!(
                "primary key ({}) vs ({})",
                self.primary_key_string(),
                other.primary_key_string()
            ));
        }
        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| !other.table.has_column(c))
            .chain(other.columns.iter().filter(|c| !self.table.has_column(c)))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Some(format!("columns differ: {}", missing.join(", ")));
        }
        for (name, column) in &self.table.columns {
            if let Some(that) = other.table.column(name) {
                if !column.type_equals(that) {
                    return Some(format!(
                        "column {} is {} vs {}",
                        name, column.type_name, that.type_name
                    ));
                }
            }
        }
        None
    }

    /// Compared signature: primary key columns, then every column with its
    /// logical type.
    pub fn definition(&self) -> String {
        let dialect = self.dialect();
        let columns: Vec<String> = self
            .table
            .columns
            .values()
            .map(|c| format!("{} {}", dialect.quote_identifier(&c.name), c.type_name))
            .collect();
        format!(
            "PRIMARY KEY ({}) COLUMNS ({})",
            self.primary_key_string(),
            columns.join(", ")
        )
    }

    fn primary_key_string(&self) -> String {
        self.dialect().quote_columns(&self.primary_keys)
    }

    fn projection(&self, columns: &[String]) -> String {
        let dialect = self.dialect();
        // No aliases: ORDER BY must keep resolving to the native columns
        columns
            .iter()
            .map(|c| dialect.text_projection(&dialect.quote_identifier(c)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Load every primary key tuple under the active filter, in key order.
    pub fn primary_rows(&self) -> Result<PrimaryRows> {
        let sql = format!(
            "SELECT {} FROM {} WHERE ({}) ORDER BY {}",
            self.projection(&self.primary_keys),
            self.quoted_name,
            self.filter_condition,
            self.primary_key_string()
        );

        let mut result = PrimaryRows::new();
        for row in self.conn.query(&sql)? {
            result.insert(tuple_key(&row), row);
        }
        Ok(result)
    }

    /// Number of pages needed to cover `count` key tuples.
    pub fn page_count(&self, count: usize) -> usize {
        (count + self.page_size - 1) / self.page_size
    }

    /// Full rows for one page of `tuples`, ordered by primary key. Ignore
    /// columns are not applied here. A page past the end yields no rows.
    pub fn records_for_keys(&self, tuples: &[KeyTuple], page: usize) -> Result<Vec<Record>> {
        let Some(chunk) = tuples.chunks(self.page_size).nth(page) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "SELECT {} FROM {} WHERE ({}) AND {} ORDER BY {}",
            self.projection(&self.columns),
            self.quoted_name,
            self.filter_condition,
            self.build_where(chunk),
            self.primary_key_string()
        );

        Ok(self
            .conn
            .query(&sql)?
            .into_iter()
            .map(|row| self.to_record(row))
            .collect())
    }

    fn to_record(&self, row: TextRow) -> Record {
        self.columns.iter().cloned().zip(row).collect()
    }

    fn record_key(&self, record: &Record) -> String {
        let tuple: KeyTuple = self
            .primary_keys
            .iter()
            .map(|k| record.get(k).cloned().flatten())
            .collect();
        tuple_key(&tuple)
    }

    fn is_ignored(&self, column: &str) -> bool {
        self.ignore_columns.iter().any(|c| c == column)
    }

    /// One INSERT per row of `source` matching `tuples`.
    pub fn insert_sql(&self, tuples: &[KeyTuple], source: &TableScanner<'_>) -> Result<Vec<String>> {
        let columns: Vec<&String> = self.columns.iter().filter(|c| !self.is_ignored(c)).collect();
        let dialect = self.dialect();
        let mut sqls = Vec::new();

        for page in 0..self.page_count(tuples.len()) {
            for row in source.records_for_keys(tuples, page)? {
                if dialect.supports_insert_set() {
                    let pairs: Vec<(&str, Option<&str>)> = columns
                        .iter()
                        .map(|c| (c.as_str(), row.get(c.as_str()).and_then(|v| v.as_deref())))
                        .collect();
                    sqls.push(format!(
                        "INSERT INTO {} SET\n  {}",
                        self.quoted_name,
                        self.join_key_value(&pairs, " = ").join(",\n  ")
                    ));
                } else {
                    let names: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c)).collect();
                    let values: Vec<String> = columns
                        .iter()
                        .map(|c| dialect.quote_value(row.get(c.as_str()).and_then(|v| v.as_deref())))
                        .collect();
                    sqls.push(format!(
                        "INSERT INTO {} ({}) VALUES\n  ({})",
                        self.quoted_name,
                        names.join(", "),
                        values.join(", ")
                    ));
                }
            }
        }
        Ok(sqls)
    }

    /// One UPDATE per tuple whose non-ignored columns differ between this
    /// table and `new`. Rows are paired by primary key within each page.
    pub fn update_sql(&self, tuples: &[KeyTuple], new: &TableScanner<'_>) -> Result<Vec<String>> {
        let mut sqls = Vec::new();

        for page in 0..self.page_count(tuples.len()) {
            let old_rows = self.records_for_keys(tuples, page)?;
            let mut new_rows: HashMap<String, Record> = new
                .records_for_keys(tuples, page)?
                .into_iter()
                .map(|row| (new.record_key(&row), row))
                .collect();

            for old_row in old_rows {
                let Some(new_row) = new_rows.remove(&self.record_key(&old_row)) else {
                    continue;
                };

                let deltas: Vec<&str> = self
                    .columns
                    .iter()
                    .filter(|c| !self.is_ignored(c))
                    .filter(|c| old_row.get(c.as_str()) != new_row.get(c.as_str()))
                    .map(String::as_str)
                    .collect();
                if deltas.is_empty() {
                    continue;
                }

                let before: Vec<(&str, Option<&str>)> = deltas
                    .iter()
                    .map(|c| (*c, old_row.get(*c).and_then(|v| v.as_deref())))
                    .collect();
                let after: Vec<(&str, Option<&str>)> = deltas
                    .iter()
                    .map(|c| (*c, new_row.get(*c).and_then(|v| v.as_deref())))
                    .collect();

                sqls.push(format!(
                    "{}\nUPDATE {} SET\n  {}\nWHERE {}",
                    self.commentize(&before),
                    self.quoted_name,
                    self.join_key_value(&after, " = ").join(",\n  "),
                    self.row_where(&new_row)
                ));
            }
        }
        Ok(sqls)
    }

    /// One DELETE per row of `source` matching `tuples`, each preceded by a
    /// comment showing the row being removed.
    pub fn delete_sql(&self, tuples: &[KeyTuple], source: &TableScanner<'_>) -> Result<Vec<String>> {
        let mut sqls = Vec::new();

        for page in 0..self.page_count(tuples.len()) {
            for row in source.records_for_keys(tuples, page)? {
                let current: Vec<(&str, Option<&str>)> = row
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_deref()))
                    .collect();
                sqls.push(format!(
                    "{}\nDELETE FROM {} WHERE {}",
                    self.commentize(&current),
                    self.quoted_name,
                    self.row_where(&row)
                ));
            }
        }
        Ok(sqls)
    }

    /// Predicate matching any of `tuples`. Single-column keys use `IN`; an
    /// empty list matches nothing.
    pub fn build_where(&self, tuples: &[KeyTuple]) -> String {
        if tuples.is_empty() {
            return "FALSE".to_string();
        }
        let dialect = self.dialect();

        if let [key] = self.primary_keys.as_slice() {
            let values: Vec<String> = tuples
                .iter()
                .map(|t| dialect.quote_value(t.first().and_then(|v| v.as_deref())))
                .collect();
            return format!("({} IN ({}))", dialect.quote_identifier(key), values.join(", "));
        }

        let alternatives: Vec<String> = tuples
            .iter()
            .map(|tuple| {
                let pairs: Vec<(&str, Option<&str>)> = self
                    .primary_keys
                    .iter()
                    .zip(tuple)
                    .map(|(k, v)| (k.as_str(), v.as_deref()))
                    .collect();
                self.conjunction(&pairs)
            })
            .collect();
        format!("({})", alternatives.join(" OR "))
    }

    fn row_where(&self, row: &Record) -> String {
        let pairs: Vec<(&str, Option<&str>)> = self
            .primary_keys
            .iter()
            .map(|k| (k.as_str(), row.get(k).and_then(|v| v.as_deref())))
            .collect();
        self.conjunction(&pairs)
    }

    fn conjunction(&self, pairs: &[(&str, Option<&str>)]) -> String {
        let dialect = self.dialect();
        let terms: Vec<String> = pairs
            .iter()
            .map(|(k, v)| format!("{} = {}", dialect.quote_identifier(k), dialect.quote_value(*v)))
            .collect();
        format!("({})", terms.join(" AND "))
    }

    /// `key = value` lines with keys padded to a common width.
    fn join_key_value(&self, pairs: &[(&str, Option<&str>)], separator: &str) -> Vec<String> {
        let dialect = self.dialect();
        let keys: Vec<String> = pairs.iter().map(|(k, _)| dialect.quote_identifier(k)).collect();
        let pad = keys
            .iter()
            .map(|k| k.width())
            .max()
            .unwrap_or(0)
            .min(MAX_KEY_PADDING);

        keys.iter()
            .zip(pairs)
            .map(|(key, (_, value))| {
                format!(
                    "{}{}{}{}",
                    key,
                    " ".repeat(pad.saturating_sub(key.width())),
                    separator,
                    dialect.quote_value(*value)
                )
            })
            .collect()
    }

    fn commentize(&self, pairs: &[(&str, Option<&str>)]) -> String {
        let truncated: Vec<(&str, Option<String>)> = pairs
            .iter()
            .map(|(k, v)| (*k, v.map(|s| truncate_width(s, self.comment_width))))
            .collect();
        let borrowed: Vec<(&str, Option<&str>)> = truncated
            .iter()
            .map(|(k, v)| (*k, v.as_deref()))
            .collect();
        let body = self.join_key_value(&borrowed, " : ").join(",\n  ");
        // Block comments nest in some dialects, so openers are broken up too
        let body = body.replace("*/", "* /").replace("/*", "/ *");
        format!("/* current record\n  {}\n*/", body)
    }
}

/// Cut `value` so that its display width, including a trailing `...`, does
/// not exceed `width`. Values that already fit are returned unchanged.
pub fn truncate_width(value: &str, width: usize) -> String {
    if value.width() <= width {
        return value.to_string();
    }
    let budget = width.saturating_sub(ELLIPSIS.len());
    let mut used = 0;
    let mut out = String::new();
    for c in value.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}
