//! Execution of generated statements against the database being migrated

use crate::connection::Connection;
use crate::error::{MigrationError, Result};
use crate::migrator::Migrator;

/// A statement that failed while running in force mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub statement: String,
    pub message: String,
}

/// What an apply step did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub executed: usize,
    /// Statements not run because of dry-run mode
    pub skipped: usize,
    pub failures: Vec<StatementFailure>,
}

impl ApplyReport {
    pub fn merge(&mut self, other: ApplyReport) {
        self.executed += other.executed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs statements one at a time. In dry-run mode nothing is executed; in
/// force mode failures are recorded and execution continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct Applier {
    pub dry_run: bool,
    pub force: bool,
}

impl Applier {
    pub fn new(dry_run: bool, force: bool) -> Self {
        Self { dry_run, force }
    }

    /// Run DDL against `conn`. The migrator's cached snapshot of `conn` is
    /// invalidated as soon as one statement has succeeded, including when a
    /// later statement fails.
    pub fn apply_ddl(
        &self,
        migrator: &mut Migrator,
        conn: &dyn Connection,
        sqls: &[String],
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        if self.dry_run {
            report.skipped = sqls.len();
            return Ok(report);
        }

        let outcome = self.run_each(conn, sqls, &mut report);
        if report.executed > 0 {
            migrator.invalidate(conn.id());
        }
        outcome.map(|_| report)
    }

    /// Run the DML of one table inside a transaction. Any failure rolls the
    /// whole table back; in force mode the failure is recorded and the caller
    /// may continue with the next table.
    pub fn apply_dml(&self, conn: &dyn Connection, table: &str, sqls: &[String]) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        if self.dry_run {
            report.skipped = sqls.len();
            return Ok(report);
        }
        if sqls.is_empty() {
            return Ok(report);
        }

        conn.begin()?;
        for sql in sqls {
            if let Err(e) = conn.execute(sql) {
                conn.rollback()?;
                log::warn!("Rolled back {} after failure: {}", table, e);
                if !self.force {
                    return Err(MigrationError::statement(sql.as_str(), e.to_string()));
                }
                report.executed = 0;
                report.failures.push(StatementFailure {
                    statement: sql.clone(),
                    message: e.to_string(),
                });
                return Ok(report);
            }
            report.executed += 1;
        }
        conn.commit()?;
        log::info!("Applied {} statement(s) to {}", report.executed, table);
        Ok(report)
    }

    /// Run the statements of a script, skipping blank fragments.
    pub fn apply_script(&self, conn: &dyn Connection, statements: &[String]) -> Result<ApplyReport> {
        let statements: Vec<String> = statements
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let mut report = ApplyReport::default();
        if self.dry_run {
            report.skipped = statements.len();
            return Ok(report);
        }
        self.run_each(conn, &statements, &mut report)?;
        Ok(report)
    }

    fn run_each(&self, conn: &dyn Connection, sqls: &[String], report: &mut ApplyReport) -> Result<()> {
        for sql in sqls {
            match conn.execute(sql) {
                Ok(_) => report.executed += 1,
                Err(e) if self.force => {
                    log::warn!("Statement failed, continuing: {}", e);
                    report.failures.push(StatementFailure {
                        statement: sql.clone(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(MigrationError::statement(sql.as_str(), e.to_string())),
            }
        }
        Ok(())
    }
}
