//! DuckDB dialect.
//!
//! DuckDB cannot add or drop foreign keys on an existing table, and primary
//! keys can be added but never dropped, so those changes either get inlined
//! into CREATE TABLE or are reported as unsupported.

use super::Dialect;
use crate::error::{MigrationError, Result};
use crate::schema::{Column, ForeignKey, Index};
use crate::schema_diff::ColumnChange;

/// DuckDB SQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn identifier_quote_char(&self) -> char {
        '"'
    }

    fn supports_alter_foreign_key(&self) -> bool {
        false
    }

    fn type_sql(&self, column: &Column) -> String {
        let unsigned = column.unsigned;
        match column.type_name.as_str() {
            "smallint" if unsigned => "USMALLINT".to_string(),
            "smallint" => "SMALLINT".to_string(),
            "integer" if unsigned => "UINTEGER".to_string(),
            "integer" => "INTEGER".to_string(),
            "bigint" if unsigned => "UBIGINT".to_string(),
            "bigint" => "BIGINT".to_string(),
            "boolean" => "BOOLEAN".to_string(),
            "float" => "DOUBLE".to_string(),
            "decimal" => match (column.precision, column.scale) {
                (Some(p), Some(s)) => format!("DECIMAL({}, {})", p, s),
                (Some(p), None) => format!("DECIMAL({}, 0)", p),
                _ => "DECIMAL".to_string(),
            },
            "string" | "text" => "VARCHAR".to_string(),
            "date" => "DATE".to_string(),
            "datetime" => "TIMESTAMP".to_string(),
            "datetimetz" => "TIMESTAMPTZ".to_string(),
            "time" => "TIME".to_string(),
            "blob" | "binary" => "BLOB".to_string(),
            "guid" => "UUID".to_string(),
            "json" => "JSON".to_string(),
            other => other.to_uppercase(),
        }
    }

    fn drop_index_sql(&self, table: &str, index: &Index) -> Result<String> {
        if index.primary {
            return Err(MigrationError::unsupported_operation(
                self.name(),
                format!("drop primary key of {}", table),
            ));
        }
        Ok(format!("DROP INDEX {}", self.quote_identifier(&index.name)))
    }

    fn create_foreign_key_sql(&self, table: &str, fk: &ForeignKey) -> Result<String> {
        Err(MigrationError::unsupported_operation(
            self.name(),
            format!("add foreign key {} on existing table {}", fk.name, table),
        ))
    }

    fn drop_foreign_key_sql(&self, table: &str, fk: &ForeignKey) -> Result<String> {
        Err(MigrationError::unsupported_operation(
            self.name(),
            format!("drop foreign key {} on {}", fk.name, table),
        ))
    }

    fn alter_column_sql(&self, table: &str, change: &ColumnChange) -> Vec<String> {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(&change.new.name)
        );
        let (old, new) = (&change.old, &change.new);
        let mut sqls = Vec::new();

        if old.type_name != new.type_name
            || old.precision != new.precision
            || old.scale != new.scale
            || old.length != new.length
            || old.unsigned != new.unsigned
        {
            sqls.push(format!("{} TYPE {}", prefix, self.type_sql(new)));
        }
        if old.default != new.default {
            match &new.default {
                Some(default) => sqls.push(format!("{} SET DEFAULT {}", prefix, default)),
                None => sqls.push(format!("{} DROP DEFAULT", prefix)),
            }
        }
        if old.nullable != new.nullable {
            if new.nullable {
                sqls.push(format!("{} DROP NOT NULL", prefix));
            } else {
                sqls.push(format!("{} SET NOT NULL", prefix));
            }
        }
        sqls
    }
}
