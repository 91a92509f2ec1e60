//! Structural comparison of two schema snapshots and DDL generation

use crate::dialect::Dialect;
use crate::error::Result;
use crate::filter::{FilterResult, TableFilter};
use crate::schema::{Column, ForeignKey, Index, Schema, Table, View};
use indexmap::IndexMap;

/// A column present on both sides with a different definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChange {
    pub old: Column,
    pub new: Column,
}

/// Everything that changed inside one table. "Added" means present in the new
/// (desired) table only, "removed" means present in the old (current) table only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDiff {
    pub name: String,
    pub added_columns: Vec<Column>,
    pub changed_columns: Vec<ColumnChange>,
    pub removed_columns: Vec<Column>,
    pub added_indexes: Vec<Index>,
    /// New definitions of indexes whose columns or flags changed
    pub changed_indexes: Vec<Index>,
    pub removed_indexes: Vec<Index>,
    pub added_foreign_keys: Vec<ForeignKey>,
    pub changed_foreign_keys: Vec<ForeignKey>,
    pub removed_foreign_keys: Vec<ForeignKey>,
}

impl TableDiff {
    /// Compare two definitions of the same table. Implicit indexes are ignored.
    pub fn compare(old: &Table, new: &Table) -> Self {
        let mut diff = TableDiff {
            name: new.name.clone(),
            ..Default::default()
        };

        for (name, column) in &new.columns {
            match old.column(name) {
                None => diff.added_columns.push(column.clone()),
                Some(current) if !current.same_definition(column) => {
                    diff.changed_columns.push(ColumnChange {
                        old: current.clone(),
                        new: column.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        for (name, column) in &old.columns {
            if !new.has_column(name) {
                diff.removed_columns.push(column.clone());
            }
        }

        for index in new.indexes.iter().filter(|i| !i.implicit) {
            match old.index(&index.name).filter(|i| !i.implicit) {
                None => diff.added_indexes.push(index.clone()),
                Some(_) if old.index_changed(index) => diff.changed_indexes.push(index.clone()),
                Some(_) => {}
            }
        }
        for index in old.indexes.iter().filter(|i| !i.implicit) {
            if new.index(&index.name).filter(|i| !i.implicit).is_none() {
                diff.removed_indexes.push(index.clone());
            }
        }

        for fk in &new.foreign_keys {
            match old.foreign_key(&fk.name) {
                None => diff.added_foreign_keys.push(fk.clone()),
                Some(current) if current != fk => diff.changed_foreign_keys.push(fk.clone()),
                Some(_) => {}
            }
        }
        for fk in &old.foreign_keys {
            if new.foreign_key(&fk.name).is_none() {
                diff.removed_foreign_keys.push(fk.clone());
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.changed_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.added_indexes.is_empty()
            && self.changed_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.added_foreign_keys.is_empty()
            && self.changed_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty()
    }
}

/// Structural difference that moves the old schema toward the new one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    pub new_tables: IndexMap<String, Table>,
    pub changed_tables: IndexMap<String, TableDiff>,
    pub removed_tables: IndexMap<String, Table>,
    pub new_views: IndexMap<String, View>,
    /// New definitions of views whose SELECT text changed
    pub changed_views: IndexMap<String, View>,
    pub removed_views: IndexMap<String, View>,
}

impl SchemaDiff {
    pub fn compare(old: &Schema, new: &Schema) -> Self {
        let old = old.normalized();
        let new = new.normalized();
        let mut diff = SchemaDiff::default();

        for (name, table) in &new.tables {
            match old.tables.get(name) {
                None => {
                    diff.new_tables.insert(name.clone(), table.clone());
                }
                Some(current) => {
                    let table_diff = TableDiff::compare(current, table);
                    if !table_diff.is_empty() {
                        diff.changed_tables.insert(name.clone(), table_diff);
                    }
                }
            }
        }
        for (name, table) in &old.tables {
            if !new.tables.contains_key(name) {
                diff.removed_tables.insert(name.clone(), table.clone());
            }
        }

        for (name, view) in &new.views {
            match old.views.get(name) {
                None => {
                    diff.new_views.insert(name.clone(), view.clone());
                }
                Some(current) if current.sql.trim() != view.sql.trim() => {
                    diff.changed_views.insert(name.clone(), view.clone());
                }
                Some(_) => {}
            }
        }
        for (name, view) in &old.views {
            if !new.views.contains_key(name) {
                diff.removed_views.insert(name.clone(), view.clone());
            }
        }

        diff
    }

    /// Drop every table-level change whose table name the filter does not include.
    pub fn retain_tables(&mut self, filter: &TableFilter) {
        let keep = |name: &String| filter.check(name) == FilterResult::Included;
        self.new_tables.retain(|name, _| keep(name));
        self.changed_tables.retain(|name, _| keep(name));
        self.removed_tables.retain(|name, _| keep(name));
    }

    pub fn clear_views(&mut self) {
        self.new_views.clear();
        self.changed_views.clear();
        self.removed_views.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty()
            && self.changed_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.new_views.is_empty()
            && self.changed_views.is_empty()
            && self.removed_views.is_empty()
    }
}

/// Compare two snapshots and render the DDL that moves `old` toward `new`.
///
/// Table filtering happens before rendering; when `include_views` is false every
/// view change is discarded.
pub fn diff_schema(
    old: &Schema,
    new: &Schema,
    filter: &TableFilter,
    include_views: bool,
    dialect: &dyn Dialect,
) -> Result<Vec<String>> {
    let mut diff = SchemaDiff::compare(old, new);
    diff.retain_tables(filter);
    if !include_views {
        diff.clear_views();
    }
    dialect.render_schema_diff(&diff)
}
