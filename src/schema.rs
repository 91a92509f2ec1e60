//! In-memory schema snapshot: tables, columns, indexes, foreign keys and views

use crate::error::{MigrationError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name given to primary key indexes
pub const PRIMARY_INDEX_NAME: &str = "PRIMARY";

/// Logical type tags of numeric columns, the only ones for which `unsigned` is meaningful
const NUMERIC_TYPES: &[&str] = &["smallint", "integer", "bigint", "decimal", "float"];

/// Column description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Logical type tag (`integer`, `string`, `datetime`, ...)
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub autoincrement: bool,
    #[serde(default)]
    pub platform_options: BTreeMap<String, String>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: false,
            default: None,
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            autoincrement: false,
            platform_options: BTreeMap::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    pub fn is_numeric(&self) -> bool {
        NUMERIC_TYPES.contains(&self.type_name.as_str())
    }

    /// Two columns are type-equal when their logical type tags match exactly.
    pub fn type_equals(&self, other: &Column) -> bool {
        self.type_name == other.type_name
    }

    /// Attribute-level equality used by schema diffing. The unsigned flag is
    /// only compared for numeric types.
    pub fn same_definition(&self, other: &Column) -> bool {
        self.type_name == other.type_name
            && self.nullable == other.nullable
            && self.default == other.default
            && self.length == other.length
            && self.precision == other.precision
            && self.scale == other.scale
            && (!self.is_numeric() || self.unsigned == other.unsigned)
            && self.autoincrement == other.autoincrement
    }
}

/// Index description. `implicit` marks indexes the platform created on its own
/// (for example to back a foreign key); they never take part in diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    #[serde(default)]
    pub implicit: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            primary: false,
            implicit: false,
        }
    }

    pub fn primary(columns: &[&str]) -> Self {
        Self {
            unique: true,
            primary: true,
            ..Self::new(PRIMARY_INDEX_NAME, columns)
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn implicit(mut self) -> Self {
        self.implicit = true;
        self
    }

    fn same_definition(&self, other: &Index) -> bool {
        self.columns == other.columns && self.unique == other.unique && self.primary == other.primary
    }
}

/// Foreign key constraint description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub local_columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        local_columns: &[&str],
        foreign_table: impl Into<String>,
        foreign_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            local_columns: local_columns.iter().map(|c| c.to_string()).collect(),
            foreign_table: foreign_table.into(),
            foreign_columns: foreign_columns.iter().map(|c| c.to_string()).collect(),
            options: BTreeMap::new(),
        }
    }
}

/// Table description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: IndexMap<String, Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.set_primary_key(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Replace any existing primary key. Primary key columns are forced NOT NULL.
    pub fn set_primary_key(&mut self, columns: Vec<String>) {
        self.indexes.retain(|i| !i.primary);
        for name in &columns {
            if let Some(column) = self.columns.get_mut(name) {
                column.nullable = false;
            }
        }
        self.indexes.insert(
            0,
            Index {
                name: PRIMARY_INDEX_NAME.to_string(),
                columns,
                unique: true,
                primary: true,
                implicit: false,
            },
        );
    }

    pub fn add_index(&mut self, index: Index) {
        if index.primary {
            self.set_primary_key(index.columns);
        } else {
            self.indexes.retain(|i| i.name != index.name);
            self.indexes.push(index);
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.primary)
    }

    pub fn primary_key_columns(&self) -> Option<&[String]> {
        self.primary_key().map(|i| i.columns.as_slice())
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_key().map_or(false, |i| !i.columns.is_empty())
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|f| f.name == name)
    }

    /// Non-implicit indexes, primary key first, then by name.
    pub fn explicit_indexes(&self) -> Vec<&Index> {
        let mut indexes: Vec<&Index> = self.indexes.iter().filter(|i| !i.implicit).collect();
        indexes.sort_by(|a, b| b.primary.cmp(&a.primary).then_with(|| a.name.cmp(&b.name)));
        indexes
    }

    pub(crate) fn index_changed(&self, other: &Index) -> bool {
        self.index(&other.name)
            .map_or(false, |mine| !mine.same_definition(other))
    }
}

/// View description; `sql` is the defining SELECT statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub sql: String,
}

impl View {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Snapshot of one database's structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: IndexMap<String, Table>,
    pub views: IndexMap<String, View>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.add_view(view);
        self
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn add_view(&mut self, view: View) {
        self.views.insert(view.name.clone(), view);
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Resolve a table or fail with `TableNotFound`.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| MigrationError::table_not_found(name))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Copy of the schema with every implicit index removed.
    pub fn normalized(&self) -> Schema {
        let mut schema = self.clone();
        for table in schema.tables.values_mut() {
            table.indexes.retain(|i| !i.implicit);
        }
        schema
    }
}
