//! Command implementations for dbmigrate CLI

use crate::apply::{Applier, ApplyReport};
use crate::cli::{Commands, DiffType, FilterArgs};
use crate::config::RunConfig;
use crate::connection::{Connection, DuckDbConnection};
use crate::error::{MigrationError, Result};
use crate::filter::TableFilter;
use crate::migrator::{DdlOptions, DmlOptions, Migrator, PlanOutcome, TablePlan};
use crate::output::{format_sql, title_width, PrettyPrinter};
use crate::progress::ProgressReporter;
use crate::splitter::{dialect_quote_chars, split_statements};
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Execute a command
pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let mut config = RunConfig::load(config_path)?;

    match command {
        Commands::Diff {
            old,
            new,
            diff_type,
            filters,
        } => {
            apply_filters(&mut config, &filters)?;
            diff_command(&old, &new, diff_type, &config)
        }
        Commands::Migrate {
            old,
            new,
            check,
            force,
            filters,
        } => {
            apply_filters(&mut config, &filters)?;
            migrate_command(&old, &new, Applier::new(check, force), &config)
        }
        Commands::Exec {
            db,
            file,
            check,
            force,
        } => exec_command(&db, &file, Applier::new(check, force), &config),
    }
}

fn apply_filters(config: &mut RunConfig, filters: &FilterArgs) -> Result<()> {
    filters.apply_to(config);
    config.validate()?;
    // Reject bad patterns before any database is touched
    TableFilter::new(&config.include, &config.exclude)?;
    Ok(())
}

/// Open an existing database file.
fn open_database(path: &Path, config: &RunConfig) -> Result<DuckDbConnection> {
    if !path.exists() {
        return Err(MigrationError::invalid_input(format!(
            "Database not found: {}",
            path.display()
        )));
    }
    DuckDbConnection::open(path, &config.duckdb)
}

/// Print the DDL and/or DML that would migrate `old` toward `new`
fn diff_command(old_path: &Path, new_path: &Path, diff_type: DiffType, config: &RunConfig) -> Result<()> {
    let old = open_database(old_path, config)?;
    let new = open_database(new_path, config)?;
    let mut migrator = Migrator::new();

    if diff_type.includes_ddl() {
        let sqls = show_ddl(&mut migrator, &old, &new, config)?;
        log::info!("{} DDL statement(s)", sqls.len());
    }

    if diff_type.includes_dml() {
        let plans = plan_tables(&mut migrator, &old, &new, config)?;
        show_dml(&plans, config);
        let total: usize = plans.iter().map(|p| p.statements().len()).sum();
        log::info!("{} DML statement(s) across {} table(s)", total, plans.len());
    }

    Ok(())
}

/// Apply DDL, then the DML of each table, to `old`
fn migrate_command(old_path: &Path, new_path: &Path, applier: Applier, config: &RunConfig) -> Result<()> {
    let old = open_database(old_path, config)?;
    let new = open_database(new_path, config)?;
    let mut migrator = Migrator::new();
    let mut report = ApplyReport::default();

    let ddl = show_ddl(&mut migrator, &old, &new, config)?;
    if !ddl.is_empty() {
        report.merge(applier.apply_ddl(&mut migrator, &old, &ddl)?);
    }

    let plans = plan_tables(&mut migrator, &old, &new, config)?;
    let width = title_width(plans.iter().map(|p| p.table.as_str()));
    PrettyPrinter::print_section("diff DML");
    for plan in &plans {
        match &plan.outcome {
            PlanOutcome::Skipped(reason) => PrettyPrinter::print_skip(&plan.table, reason, width),
            PlanOutcome::Statements(sqls) => {
                PrettyPrinter::print_table_diff(&plan.table, width);
                PrettyPrinter::print_statements(sqls, config.omit_length);
                report.merge(applier.apply_dml(&old, &plan.table, sqls)?);
            }
        }
    }

    PrettyPrinter::print_apply_report(&report);
    if !report.is_clean() {
        log::warn!("{} statement(s) failed", report.failures.len());
    }
    Ok(())
}

/// Run a SQL script against one database
fn exec_command(db_path: &Path, file: &Path, applier: Applier, config: &RunConfig) -> Result<()> {
    let db = open_database(db_path, config)?;
    let script = fs::read_to_string(file)
        .with_context(|| format!("Failed to read script {}", file.display()))?;
    let statements = split_statements(&script, &dialect_quote_chars(db.dialect()));

    for statement in statements.iter().filter(|s| !s.trim().is_empty()) {
        println!("{}", format_sql(statement.trim(), config.omit_length));
    }
    let report = applier.apply_script(&db, &statements)?;
    PrettyPrinter::print_apply_report(&report);
    Ok(())
}

fn show_ddl(
    migrator: &mut Migrator,
    old: &dyn Connection,
    new: &dyn Connection,
    config: &RunConfig,
) -> Result<Vec<String>> {
    PrettyPrinter::print_section("diff DDL");
    let sqls = migrator.ddl(old, new, &DdlOptions::from(config))?;
    if sqls.is_empty() {
        PrettyPrinter::print_no_diff("schema");
    } else {
        PrettyPrinter::print_statements(&sqls, config.omit_length);
    }
    Ok(sqls)
}

/// Row diff of every table, with a spinner while scanning
fn plan_tables(
    migrator: &mut Migrator,
    old: &dyn Connection,
    new: &dyn Connection,
    config: &RunConfig,
) -> Result<Vec<TablePlan>> {
    let options = DmlOptions::from(config);
    let filter = TableFilter::new(&options.includes, &options.excludes)?;
    let tables: Vec<String> = migrator.schema(new)?.tables.keys().cloned().collect();

    let mut progress = ProgressReporter::new_for_tables(tables.len());
    let mut plans = Vec::with_capacity(tables.len());
    for table in &tables {
        progress.start_table(table);
        plans.push(migrator.plan_table(old, new, table, &filter, &options)?);
        progress.finish_table();
    }
    progress.finish();
    Ok(plans)
}

fn show_dml(plans: &[TablePlan], config: &RunConfig) {
    PrettyPrinter::print_section("diff DML");
    let width = title_width(plans.iter().map(|p| p.table.as_str()));
    for plan in plans {
        match &plan.outcome {
            PlanOutcome::Skipped(reason) => PrettyPrinter::print_skip(&plan.table, reason, width),
            PlanOutcome::Statements(sqls) => {
                PrettyPrinter::print_table_diff(&plan.table, width);
                PrettyPrinter::print_statements(sqls, config.omit_length);
            }
        }
    }
}
