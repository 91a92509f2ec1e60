//! Migration run context: schema and row diffing between two connections

use crate::cache::SchemaCache;
use crate::config::{DmlTypes, RunConfig};
use crate::connection::{Connection, ConnectionId};
use crate::error::{MigrationError, Result};
use crate::filter::{FilterResult, TableFilter};
use crate::scanner::{KeyTuple, TableScanner};
use crate::schema::Schema;
use crate::schema_diff::diff_schema;
use crate::{DEFAULT_COMMENT_WIDTH, DEFAULT_PAGE_SIZE};
use std::fmt;
use std::rc::Rc;

/// Options for structural diffing
#[derive(Debug, Clone)]
pub struct DdlOptions {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub include_views: bool,
}

impl Default for DdlOptions {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
            include_views: true,
        }
    }
}

impl From<&RunConfig> for DdlOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            includes: config.include.clone(),
            excludes: config.exclude.clone(),
            include_views: config.include_views,
        }
    }
}

/// Options for row diffing
#[derive(Debug, Clone)]
pub struct DmlOptions {
    pub conditions: Vec<String>,
    pub ignores: Vec<String>,
    pub types: DmlTypes,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub page_size: usize,
    pub comment_width: usize,
}

impl Default for DmlOptions {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            ignores: Vec::new(),
            types: DmlTypes::default(),
            includes: Vec::new(),
            excludes: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            comment_width: DEFAULT_COMMENT_WIDTH,
        }
    }
}

impl From<&RunConfig> for DmlOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            conditions: config.conditions.clone(),
            ignores: config.ignore.clone(),
            types: config.dml_types,
            includes: config.include.clone(),
            excludes: config.exclude.clone(),
            page_size: config.page_size,
            comment_width: config.comment_width,
        }
    }
}

/// Why no statements were produced for a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedByInclude,
    ExcludedByExclude,
    /// The table is missing from the old database
    NotExists,
    NoPrimaryKey,
    StructuralMismatch(String),
    NoDiff,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ExcludedByInclude => write!(f, "not match include"),
            SkipReason::ExcludedByExclude => write!(f, "match exclude"),
            SkipReason::NotExists => write!(f, "not exists"),
            SkipReason::NoPrimaryKey => write!(f, "has no primary key"),
            SkipReason::StructuralMismatch(reason) => {
                write!(f, "has different definition between schema ({})", reason)
            }
            SkipReason::NoDiff => write!(f, "no diff"),
        }
    }
}

/// Row diff outcome for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Statements(Vec<String>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub table: String,
    pub outcome: PlanOutcome,
}

impl TablePlan {
    fn skipped(table: &str, reason: SkipReason) -> Self {
        Self {
            table: table.to_string(),
            outcome: PlanOutcome::Skipped(reason),
        }
    }

    pub fn statements(&self) -> &[String] {
        match &self.outcome {
            PlanOutcome::Statements(sqls) => sqls,
            PlanOutcome::Skipped(_) => &[],
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.outcome {
            PlanOutcome::Skipped(reason) => Some(reason),
            PlanOutcome::Statements(_) => None,
        }
    }
}

/// Owns the schema cache for one migration run. `old` is always the database
/// being migrated, `new` the desired state.
#[derive(Debug, Default)]
pub struct Migrator {
    cache: SchemaCache,
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_mut(&mut self) -> &mut SchemaCache {
        &mut self.cache
    }

    /// Cached schema snapshot of `conn`.
    pub fn schema(&mut self, conn: &dyn Connection) -> Result<Rc<Schema>> {
        self.cache.get(conn)
    }

    /// Drop the cached snapshot of a connection. Must be called after DDL ran
    /// against it.
    pub fn invalidate(&mut self, id: &ConnectionId) {
        self.cache.invalidate(id);
    }

    /// DDL that moves `old`'s structure toward `new`'s, rendered in `old`'s dialect.
    pub fn ddl(
        &mut self,
        old: &dyn Connection,
        new: &dyn Connection,
        options: &DdlOptions,
    ) -> Result<Vec<String>> {
        let old_schema = self.schema(old)?;
        let new_schema = self.schema(new)?;
        let filter = TableFilter::new(&options.includes, &options.excludes)?;
        diff_schema(
            &old_schema,
            &new_schema,
            &filter,
            options.include_views,
            old.dialect(),
        )
    }

    /// DML that moves the rows of `table` in `old` toward `new`: deletes,
    /// then updates, then inserts.
    pub fn dml(
        &mut self,
        old: &dyn Connection,
        new: &dyn Connection,
        table: &str,
        options: &DmlOptions,
    ) -> Result<Vec<String>> {
        let old_schema = self.schema(old)?;
        let new_schema = self.schema(new)?;
        let old_table = old_schema.table(table)?;
        let new_table = new_schema.table(table)?;

        let old_scanner = TableScanner::new(old, old_table, &options.conditions, &options.ignores)?
            .with_page_size(options.page_size)
            .with_comment_width(options.comment_width);
        let new_scanner = TableScanner::new(new, new_table, &options.conditions, &options.ignores)?
            .with_page_size(options.page_size)
            .with_comment_width(options.comment_width);

        if !old_scanner.equals(&new_scanner) {
            let reason = old_scanner
                .mismatch_reason(&new_scanner)
                .unwrap_or_else(|| "definition differs".to_string());
            return Err(MigrationError::structural_mismatch(
                table,
                reason,
                old_scanner.definition(),
                new_scanner.definition(),
            ));
        }

        let old_tuples = old_scanner.primary_rows()?;
        let new_tuples = new_scanner.primary_rows()?;

        let mut sqls = Vec::new();

        if options.types.delete {
            let deleted: Vec<KeyTuple> = old_tuples
                .iter()
                .filter(|(key, _)| !new_tuples.contains_key(*key))
                .map(|(_, tuple)| tuple.clone())
                .collect();
            if !deleted.is_empty() {
                sqls.extend(old_scanner.delete_sql(&deleted, &old_scanner)?);
            }
        }

        if options.types.update {
            let common: Vec<KeyTuple> = old_tuples
                .iter()
                .filter(|(key, _)| new_tuples.contains_key(*key))
                .map(|(_, tuple)| tuple.clone())
                .collect();
            if !common.is_empty() {
                sqls.extend(old_scanner.update_sql(&common, &new_scanner)?);
            }
        }

        if options.types.insert {
            let inserted: Vec<KeyTuple> = new_tuples
                .iter()
                .filter(|(key, _)| !old_tuples.contains_key(*key))
                .map(|(_, tuple)| tuple.clone())
                .collect();
            if !inserted.is_empty() {
                sqls.extend(old_scanner.insert_sql(&inserted, &new_scanner)?);
            }
        }

        Ok(sqls)
    }

    /// Row diff for one table of the new schema, turning the skippable
    /// failures into a skip reason.
    pub fn plan_table(
        &mut self,
        old: &dyn Connection,
        new: &dyn Connection,
        table: &str,
        filter: &TableFilter,
        options: &DmlOptions,
    ) -> Result<TablePlan> {
        match filter.check(table) {
            FilterResult::ExcludedByInclude => {
                return Ok(TablePlan::skipped(table, SkipReason::ExcludedByInclude))
            }
            FilterResult::ExcludedByExclude => {
                return Ok(TablePlan::skipped(table, SkipReason::ExcludedByExclude))
            }
            FilterResult::Included => {}
        }

        if !self.schema(old)?.has_table(table) {
            return Ok(TablePlan::skipped(table, SkipReason::NotExists));
        }

        let outcome = match self.dml(old, new, table, options) {
            Ok(sqls) if sqls.is_empty() => PlanOutcome::Skipped(SkipReason::NoDiff),
            Ok(sqls) => PlanOutcome::Statements(sqls),
            Err(MigrationError::NoPrimaryKey { .. }) => PlanOutcome::Skipped(SkipReason::NoPrimaryKey),
            Err(MigrationError::StructuralMismatch { reason, .. }) => {
                PlanOutcome::Skipped(SkipReason::StructuralMismatch(reason))
            }
            Err(MigrationError::TableNotFound { .. }) => PlanOutcome::Skipped(SkipReason::NotExists),
            Err(e) => return Err(e),
        };
        Ok(TablePlan {
            table: table.to_string(),
            outcome,
        })
    }

    /// Row diff for every table of the new schema, in schema order.
    pub fn plan_dml(
        &mut self,
        old: &dyn Connection,
        new: &dyn Connection,
        options: &DmlOptions,
    ) -> Result<Vec<TablePlan>> {
        let filter = TableFilter::new(&options.includes, &options.excludes)?;
        let tables: Vec<String> = self.schema(new)?.tables.keys().cloned().collect();

        tables
            .iter()
            .map(|table| self.plan_table(old, new, table, &filter, options))
            .collect()
    }
}
