//! Command-line interface for dbmigrate

use crate::config::{DmlTypes, RunConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dbmigrate")]
#[command(about = "Diff two databases and reconcile schema and rows")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./dbmigrate.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the statements that would migrate OLD toward NEW
    Diff {
        /// Database to migrate
        old: PathBuf,

        /// Database holding the desired state
        new: PathBuf,

        /// What to diff: "ddl", "dml" or "all"
        #[arg(long = "type", default_value = "all", value_parser = DiffType::parse)]
        diff_type: DiffType,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Apply DDL and DML so that OLD matches NEW
    Migrate {
        old: PathBuf,

        new: PathBuf,

        /// Only show what would run
        #[arg(long)]
        check: bool,

        /// Continue past failing statements
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Run a SQL script one statement at a time
    Exec {
        db: PathBuf,

        file: PathBuf,

        #[arg(long)]
        check: bool,

        #[arg(long)]
        force: bool,
    },
}

/// Table and row filters shared by `diff` and `migrate`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only tables matching one of these regexes (comma-separated allowed)
    #[arg(short, long)]
    pub include: Vec<String>,

    /// Skip tables matching one of these regexes
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Row condition, applied to every table that has the named columns
    #[arg(short = 'w', long = "where")]
    pub conditions: Vec<String>,

    /// Columns left out of UPDATE and INSERT (`col` or `table.col`)
    #[arg(short = 'g', long)]
    pub ignore: Vec<String>,

    #[arg(long)]
    pub no_insert: bool,

    #[arg(long)]
    pub no_update: bool,

    #[arg(long)]
    pub no_delete: bool,

    /// Leave views out of the schema diff
    #[arg(long)]
    pub noview: bool,

    /// Truncate displayed statements longer than this many characters
    #[arg(short, long, value_parser = validate_positive)]
    pub omit: Option<usize>,

    /// Key tuples fetched per query while scanning rows
    #[arg(long, value_parser = validate_positive)]
    pub page_size: Option<usize>,
}

impl FilterArgs {
    /// Layer these flags over the file config. List flags extend the
    /// configured lists; switches only ever turn things off.
    pub fn apply_to(&self, config: &mut RunConfig) {
        config.include.extend(self.include.iter().cloned());
        config.exclude.extend(self.exclude.iter().cloned());
        config.conditions.extend(self.conditions.iter().cloned());
        config.ignore.extend(self.ignore.iter().cloned());

        let types = &mut config.dml_types;
        *types = DmlTypes {
            insert: types.insert && !self.no_insert,
            update: types.update && !self.no_update,
            delete: types.delete && !self.no_delete,
        };
        if self.noview {
            config.include_views = false;
        }
        if let Some(omit) = self.omit {
            config.omit_length = omit;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
    }
}

/// Which statement kinds `diff` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    Ddl,
    Dml,
    All,
}

impl DiffType {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "ddl" => Ok(Self::Ddl),
            "dml" => Ok(Self::Dml),
            "all" => Ok(Self::All),
            _ => Err(format!("Invalid diff type: {}. Use 'ddl', 'dml' or 'all'", s)),
        }
    }

    pub fn includes_ddl(self) -> bool {
        matches!(self, Self::Ddl | Self::All)
    }

    pub fn includes_dml(self) -> bool {
        matches!(self, Self::Dml | Self::All)
    }
}

fn validate_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("Invalid number: '{}'. Must be a positive integer.", s))?;

    if value == 0 {
        return Err("Value must be greater than 0".to_string());
    }

    Ok(value)
}
