//! Common test utilities and helpers

use dbmigrate::apply::Applier;
use dbmigrate::cli::Cli;
use dbmigrate::commands::execute_command;
use dbmigrate::connection::TextRow;
use dbmigrate::{Connection, DmlOptions, DuckDbConnection, MigrationError, Migrator, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// DDL of the table most scenarios use
pub const FOO_TABLE: &str = "CREATE TABLE foo (id INTEGER PRIMARY KEY, code INTEGER);";

/// An in-memory (old, new) database pair
pub struct DbPair {
    pub old: DuckDbConnection,
    pub new: DuckDbConnection,
}

impl DbPair {
    /// Open both databases and run the given setup scripts.
    pub fn new(old_setup: &str, new_setup: &str) -> Result<Self> {
        let old = DuckDbConnection::open_in_memory("old")?;
        old.execute_batch(old_setup)?;
        let new = DuckDbConnection::open_in_memory("new")?;
        new.execute_batch(new_setup)?;
        Ok(Self { old, new })
    }

    /// `foo(id, code)` on both sides, filled with `(id, code)` pairs.
    pub fn foo(old_rows: &[(i64, i64)], new_rows: &[(i64, i64)]) -> Result<Self> {
        Self::new(
            &format!("{}{}", FOO_TABLE, insert_pairs("foo", old_rows)),
            &format!("{}{}", FOO_TABLE, insert_pairs("foo", new_rows)),
        )
    }

    /// Row diff of one table with a fresh migrator.
    pub fn dml(&self, table: &str, options: &DmlOptions) -> Result<Vec<String>> {
        Migrator::new().dml(&self.old, &self.new, table, options)
    }

    /// Execute statements against `old` in one transaction.
    pub fn apply(&self, table: &str, sqls: &[String]) -> Result<()> {
        Applier::default().apply_dml(&self.old, table, sqls).map(|_| ())
    }

    pub fn old_rows(&self, sql: &str) -> Vec<TextRow> {
        self.old.query(sql).expect("query on old database")
    }

    pub fn new_rows(&self, sql: &str) -> Vec<TextRow> {
        self.new.query(sql).expect("query on new database")
    }
}

/// `INSERT` statement for `(id, code)` pairs, empty when there are none.
pub fn insert_pairs(table: &str, rows: &[(i64, i64)]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let values: Vec<String> = rows.iter().map(|(a, b)| format!("({}, {})", a, b)).collect();
    format!("INSERT INTO {} VALUES {};", table, values.join(", "))
}

/// Leading keyword of a generated statement, past its comment block.
pub fn statement_kind(sql: &str) -> &str {
    let body = match sql.trim_start().strip_prefix("/*") {
        Some(rest) => rest.find("*/").map_or(rest, |end| &rest[end + 2..]),
        None => sql,
    };
    body.split_whitespace().next().unwrap_or("")
}

/// Keywords of every statement, in order
pub fn kinds(sqls: &[String]) -> Vec<&str> {
    sqls.iter().map(|s| statement_kind(s)).collect()
}

pub fn count_kind(sqls: &[String], kind: &str) -> usize {
    sqls.iter().filter(|s| statement_kind(s) == kind).count()
}

pub fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Temporary directory holding database files and scripts
pub struct FileFixture {
    pub temp_dir: TempDir,
}

impl FileFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a database file initialised by `setup`.
    pub fn create_db(&self, name: &str, setup: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        let conn = DuckDbConnection::open(&path, &Default::default())?;
        conn.execute_batch(setup)?;
        Ok(path)
    }

    /// Reopen a database file created by [`create_db`](Self::create_db).
    pub fn open_db(&self, name: &str) -> Result<DuckDbConnection> {
        DuckDbConnection::open(&self.root().join(name), &Default::default())
    }

    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Path string of a file in the fixture directory
    pub fn path_arg(&self, name: &str) -> String {
        self.root().join(name).display().to_string()
    }
}

/// Parse and execute a `dbmigrate` command line.
pub fn run_cli(args: &[&str]) -> Result<()> {
    use clap::Parser;

    let mut argv = vec!["dbmigrate"];
    argv.extend(args);
    let cli = Cli::try_parse_from(argv).map_err(|e| MigrationError::invalid_input(e.to_string()))?;
    execute_command(cli.command, cli.config.as_deref())
}
