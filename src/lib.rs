//! # dbmigrate
//!
//! Compares two databases and generates the DDL and DML that reconcile the
//! first one with the second: schema changes in an execution-safe order, and
//! row changes computed by primary key with paginated scanning.

pub mod apply;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod condition;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod introspect;
pub mod migrator;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod schema;
pub mod schema_diff;
pub mod splitter;

pub use cache::SchemaCache;
pub use connection::{Connection, ConnectionId, DuckDbConnection};
pub use error::{MigrationError, Result};
pub use filter::{filter_table, FilterResult, TableFilter};
pub use migrator::{DdlOptions, DmlOptions, Migrator};
pub use scanner::TableScanner;
pub use schema_diff::diff_schema;
pub use splitter::split_statements;

/// Default number of primary key tuples fetched per page
pub const DEFAULT_PAGE_SIZE: usize = 10000;

/// Default display width of values in statement comments
pub const DEFAULT_COMMENT_WIDTH: usize = 80;

/// Default length after which displayed statements are truncated
pub const DEFAULT_OMIT_LENGTH: usize = 1024;
