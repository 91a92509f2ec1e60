//! Error types for dbmigrate operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The table cannot be row-diffed because it has no primary key.
    #[error("{table} has no primary key.")]
    NoPrimaryKey { table: String },

    /// Old and new definitions of a table are not diff-compatible.
    #[error("{table} has different definition between schema ({reason}).")]
    StructuralMismatch {
        table: String,
        reason: String,
        old_definition: String,
        new_definition: String,
    },

    #[error("Table does not exist: {table}")]
    TableNotFound { table: String },

    #[error("{dialect} cannot render: {operation}")]
    UnsupportedOperation { dialect: String, operation: String },

    #[error("Invalid config file: {path}")]
    InvalidConfig { path: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Statement failed: {statement}: {message}")]
    Statement { statement: String, message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl MigrationError {
    pub fn no_primary_key(table: impl Into<String>) -> Self {
        Self::NoPrimaryKey {
            table: table.into(),
        }
    }

    pub fn structural_mismatch(
        table: impl Into<String>,
        reason: impl Into<String>,
        old_definition: impl Into<String>,
        new_definition: impl Into<String>,
    ) -> Self {
        Self::StructuralMismatch {
            table: table.into(),
            reason: reason.into(),
            old_definition: old_definition.into(),
            new_definition: new_definition.into(),
        }
    }

    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    pub fn unsupported_operation(dialect: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            dialect: dialect.into(),
            operation: operation.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn statement(statement: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Statement {
            statement: statement.into(),
            message: msg.into(),
        }
    }

    /// Whether a caller iterating over many tables may skip the offending
    /// table and continue with the others.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::NoPrimaryKey { .. } | Self::StructuralMismatch { .. } | Self::TableNotFound { .. }
        )
    }
}
