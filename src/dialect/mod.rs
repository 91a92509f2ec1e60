//! SQL dialects: value/identifier quoting and DDL rendering.
//!
//! Each dialect knows how to quote literals for safe embedding in generated
//! statements and how to turn a [`SchemaDiff`] into executable DDL.

mod duckdb;
mod mysql;

pub use self::duckdb::DuckDbDialect;
pub use self::mysql::MySqlDialect;

use crate::error::Result;
use crate::schema::{Column, ForeignKey, Index, Table, View};
use crate::schema_diff::{ColumnChange, SchemaDiff, TableDiff};
use indexmap::IndexMap;

/// Tables ordered so that every table comes after the tables it references.
/// References outside `tables` and self-references are ignored. Tables caught
/// in a reference cycle keep their original order, after the resolvable ones.
pub fn dependency_order(tables: &IndexMap<String, Table>) -> Vec<&Table> {
    let mut ordered: Vec<&Table> = Vec::with_capacity(tables.len());
    let mut pending: Vec<&Table> = tables.values().collect();

    while !pending.is_empty() {
        let ready = pending.iter().position(|table| {
            table.foreign_keys.iter().all(|fk| {
                fk.foreign_table == table.name
                    || !tables.contains_key(&fk.foreign_table)
                    || ordered.iter().any(|t| t.name == fk.foreign_table)
            })
        });
        match ready {
            Some(i) => ordered.push(pending.remove(i)),
            None => {
                log::warn!(
                    "Foreign key cycle between {}; keeping their listed order",
                    pending.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
                );
                ordered.append(&mut pending);
            }
        }
    }
    ordered
}

/// Database-specific SQL generation
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Character used to quote identifiers.
    fn identifier_quote_char(&self) -> char;

    /// Character used to quote string literals.
    fn string_quote_char(&self) -> char {
        '\''
    }

    /// Whether `INSERT INTO t SET col = val, ...` is accepted.
    fn supports_insert_set(&self) -> bool {
        false
    }

    /// Whether foreign keys can be added or dropped on an existing table.
    fn supports_alter_foreign_key(&self) -> bool {
        true
    }

    fn quote_identifier(&self, name: &str) -> String {
        let q = self.identifier_quote_char();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    fn quote_string(&self, value: &str) -> String {
        let q = self.string_quote_char();
        let escaped = value.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quote a value for embedding in SQL text. NULL is emitted unquoted.
    fn quote_value(&self, value: Option<&str>) -> String {
        match value {
            Some(v) => self.quote_string(v),
            None => "NULL".to_string(),
        }
    }

    /// Expression that reads a column as its text representation.
    fn text_projection(&self, quoted_column: &str) -> String {
        format!("CAST({} AS VARCHAR)", quoted_column)
    }

    /// Native type for a column's logical type tag.
    fn type_sql(&self, column: &Column) -> String;

    /// Keyword appended to autoincrement columns, if the dialect has one.
    fn auto_increment_keyword(&self) -> Option<&'static str> {
        None
    }

    fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), self.type_sql(column)];
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", default));
        }
        if column.autoincrement {
            if let Some(keyword) = self.auto_increment_keyword() {
                parts.push(keyword.to_string());
            }
        }
        parts.join(" ")
    }

    fn quote_columns(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// CREATE TABLE followed by CREATE INDEX for each secondary index.
    /// Foreign keys are inlined when they cannot be added afterwards.
    fn create_table_sql(&self, table: &Table) -> Vec<String> {
        let mut defs: Vec<String> = table
            .columns
            .values()
            .map(|c| self.column_definition(c))
            .collect();
        if let Some(columns) = table.primary_key_columns() {
            if !columns.is_empty() {
                defs.push(format!("PRIMARY KEY ({})", self.quote_columns(columns)));
            }
        }
        if !self.supports_alter_foreign_key() {
            for fk in &table.foreign_keys {
                defs.push(self.foreign_key_clause(fk));
            }
        }

        let mut sqls = vec![format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_identifier(&table.name),
            defs.join(",\n  ")
        )];
        for index in table.explicit_indexes().into_iter().filter(|i| !i.primary) {
            sqls.push(self.create_index_sql(&table.name, index));
        }
        sqls
    }

    fn foreign_key_clause(&self, fk: &ForeignKey) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_columns(&fk.local_columns),
            self.quote_identifier(&fk.foreign_table),
            self.quote_columns(&fk.foreign_columns)
        )
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote_identifier(table))
    }

    fn create_index_sql(&self, table: &str, index: &Index) -> String {
        if index.primary {
            return format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                self.quote_identifier(table),
                self.quote_columns(&index.columns)
            );
        }
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            self.quote_columns(&index.columns)
        )
    }

    fn drop_index_sql(&self, table: &str, index: &Index) -> Result<String>;

    fn create_foreign_key_sql(&self, table: &str, fk: &ForeignKey) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {}",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name),
            self.foreign_key_clause(fk)
        ))
    }

    fn drop_foreign_key_sql(&self, table: &str, fk: &ForeignKey) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name)
        ))
    }

    fn add_column_sql(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column)
        )
    }

    fn drop_column_sql(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(&column.name)
        )
    }

    /// Statements that turn `change.old` into `change.new`.
    fn alter_column_sql(&self, table: &str, change: &ColumnChange) -> Vec<String>;

    fn create_view_sql(&self, view: &View) -> String {
        format!(
            "CREATE VIEW {} AS {}",
            self.quote_identifier(&view.name),
            view.sql.trim().trim_end_matches(';')
        )
    }

    fn drop_view_sql(&self, view: &View) -> String {
        format!("DROP VIEW {}", self.quote_identifier(&view.name))
    }

    /// Statements for one changed table, excluding foreign key drops (those run
    /// before any table is created).
    fn alter_table_sql(&self, diff: &TableDiff) -> Result<Vec<String>> {
        let table = diff.name.as_str();
        let mut sqls = Vec::new();
        for index in diff.removed_indexes.iter().chain(&diff.changed_indexes) {
            sqls.push(self.drop_index_sql(table, index)?);
        }
        for column in &diff.added_columns {
            sqls.push(self.add_column_sql(table, column));
        }
        for change in &diff.changed_columns {
            sqls.extend(self.alter_column_sql(table, change));
        }
        for column in &diff.removed_columns {
            sqls.push(self.drop_column_sql(table, column));
        }
        for index in diff.added_indexes.iter().chain(&diff.changed_indexes) {
            sqls.push(self.create_index_sql(table, index));
        }
        for fk in diff.added_foreign_keys.iter().chain(&diff.changed_foreign_keys) {
            sqls.push(self.create_foreign_key_sql(table, fk)?);
        }
        Ok(sqls)
    }

    /// Render a structural diff in an order that is safe to execute:
    /// dropped/changed views, foreign key drops, new tables, their foreign
    /// keys, table alterations, table drops, then new/changed views.
    /// New tables are created parents first and dropped children first.
    fn render_schema_diff(&self, diff: &SchemaDiff) -> Result<Vec<String>> {
        let mut sqls = Vec::new();

        for view in diff.removed_views.values().chain(diff.changed_views.values()) {
            sqls.push(self.drop_view_sql(view));
        }

        for table_diff in diff.changed_tables.values() {
            for fk in table_diff
                .removed_foreign_keys
                .iter()
                .chain(&table_diff.changed_foreign_keys)
            {
                sqls.push(self.drop_foreign_key_sql(&table_diff.name, fk)?);
            }
        }
        if self.supports_alter_foreign_key() {
            for table in diff.removed_tables.values() {
                for fk in &table.foreign_keys {
                    sqls.push(self.drop_foreign_key_sql(&table.name, fk)?);
                }
            }
        }

        for table in dependency_order(&diff.new_tables) {
            sqls.extend(self.create_table_sql(table));
        }
        if self.supports_alter_foreign_key() {
            for table in diff.new_tables.values() {
                for fk in &table.foreign_keys {
                    sqls.push(self.create_foreign_key_sql(&table.name, fk)?);
                }
            }
        }

        for table_diff in diff.changed_tables.values() {
            sqls.extend(self.alter_table_sql(table_diff)?);
        }

        for table in dependency_order(&diff.removed_tables).into_iter().rev() {
            sqls.push(self.drop_table_sql(&table.name));
        }

        for view in diff.new_views.values().chain(diff.changed_views.values()) {
            sqls.push(self.create_view_sql(view));
        }

        Ok(sqls)
    }
}
