//! MySQL dialect (rendering only; no MySQL connection is provided).

use super::Dialect;
use crate::error::Result;
use crate::schema::{Column, ForeignKey, Index};
use crate::schema_diff::ColumnChange;

/// MySQL SQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote_char(&self) -> char {
        '`'
    }

    fn supports_insert_set(&self) -> bool {
        true
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn text_projection(&self, quoted_column: &str) -> String {
        format!("CAST({} AS CHAR)", quoted_column)
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn type_sql(&self, column: &Column) -> String {
        let base = match column.type_name.as_str() {
            "smallint" => "SMALLINT".to_string(),
            "integer" => "INT".to_string(),
            "bigint" => "BIGINT".to_string(),
            "boolean" => "TINYINT(1)".to_string(),
            "float" => "DOUBLE PRECISION".to_string(),
            "decimal" => format!(
                "NUMERIC({}, {})",
                column.precision.unwrap_or(10),
                column.scale.unwrap_or(0)
            ),
            "string" => format!("VARCHAR({})", column.length.unwrap_or(255)),
            "text" => "LONGTEXT".to_string(),
            "date" => "DATE".to_string(),
            "datetime" | "datetimetz" => "DATETIME".to_string(),
            "time" => "TIME".to_string(),
            "blob" | "binary" => "LONGBLOB".to_string(),
            "guid" => "CHAR(36)".to_string(),
            "json" => "JSON".to_string(),
            other => other.to_uppercase(),
        };
        if column.unsigned && column.is_numeric() {
            format!("{} UNSIGNED", base)
        } else {
            base
        }
    }

    fn drop_index_sql(&self, table: &str, index: &Index) -> Result<String> {
        if index.primary {
            return Ok(format!(
                "ALTER TABLE {} DROP PRIMARY KEY",
                self.quote_identifier(table)
            ));
        }
        Ok(format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(&index.name),
            self.quote_identifier(table)
        ))
    }

    fn drop_foreign_key_sql(&self, table: &str, fk: &ForeignKey) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name)
        ))
    }

    fn alter_column_sql(&self, table: &str, change: &ColumnChange) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(&change.new)
        )]
    }
}
