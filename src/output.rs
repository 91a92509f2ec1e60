//! Output formatting utilities

use crate::apply::ApplyReport;
use crate::migrator::SkipReason;

/// Marker appended to statements cut by the omit length
pub const OMIT_MARKER: &str = "\n...(omitted)";

/// At most this many statements of one table are printed
pub const MAX_SHOWN_STATEMENTS: usize = 1000;

/// Statement as displayed: terminated by `;` and cut to `omit_length`
/// characters (marker included) when longer.
pub fn format_sql(sql: &str, omit_length: usize) -> String {
    let sql = format!("{};", sql);
    if sql.chars().count() <= omit_length {
        return sql;
    }
    let keep = omit_length.saturating_sub(OMIT_MARKER.chars().count());
    let mut cut: String = sql.chars().take(keep).collect();
    cut.push_str(OMIT_MARKER);
    cut
}

/// Pretty printer for dbmigrate output. Everything printed is a valid SQL
/// script: commentary is emitted as `--` lines.
pub struct PrettyPrinter;

impl PrettyPrinter {
    pub fn print_section(title: &str) {
        println!("-- {}", title);
    }

    pub fn print_statements(sqls: &[String], omit_length: usize) {
        for sql in sqls.iter().take(MAX_SHOWN_STATEMENTS) {
            println!("{}", format_sql(sql, omit_length));
        }
        if sqls.len() > MAX_SHOWN_STATEMENTS {
            println!("-- more {} queries.", sqls.len() - MAX_SHOWN_STATEMENTS);
        }
    }

    pub fn print_no_diff(what: &str) {
        println!("-- no diff {}.", what);
    }

    pub fn print_table_diff(table: &str, width: usize) {
        println!("-- {} has diff:", pad_title(table, width));
    }

    pub fn print_skip(table: &str, reason: &SkipReason, width: usize) {
        println!("-- {} is skipped by {}.", pad_title(table, width), reason);
    }

    pub fn print_apply_report(report: &ApplyReport) {
        if report.skipped > 0 {
            println!("-- check mode: {} statement(s) not executed.", report.skipped);
        }
        if report.executed > 0 {
            println!("-- executed {} statement(s).", report.executed);
        }
        for failure in &report.failures {
            println!("/* {} */", failure.message.replace("*/", "* /").replace("/*", "/ *"));
            println!("-- failed: {}", first_line(&failure.statement));
        }
    }
}

/// Width used to align table names in skip/diff lines
pub fn title_width<'a>(names: impl IntoIterator<Item = &'a str>) -> usize {
    names.into_iter().map(|n| n.chars().count()).max().unwrap_or(0) + 1
}

fn pad_title(table: &str, width: usize) -> String {
    format!("{:<width$}", table, width = width)
}

/// First statement line, skipping a leading comment block.
fn first_line(sql: &str) -> &str {
    let body = match sql.trim_start().strip_prefix("/*") {
        Some(rest) => rest.find("*/").map_or(rest, |end| &rest[end + 2..]),
        None => sql,
    };
    body.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(sql)
}
