//! Database connections used by the differs.
//!
//! The differs only see the [`Connection`] trait; [`DuckDbConnection`] is the
//! concrete implementation backed by the `duckdb` crate.

use crate::config::DuckDbSettings;
use crate::dialect::{Dialect, DuckDbDialect};
use crate::error::{MigrationError, Result};
use crate::introspect;
use crate::schema::Schema;
use duckdb::types::ValueRef;
use std::fmt;
use std::path::Path;

/// Opaque, caller-supplied identity of a connection. Schema snapshots are
/// cached under this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A result row where every value is the driver's text representation
pub type TextRow = Vec<Option<String>>;

/// Blocking database connection. Not safe for concurrent use; one in-flight
/// operation per connection.
pub trait Connection {
    fn id(&self) -> &ConnectionId;

    fn dialect(&self) -> &dyn Dialect;

    fn dialect_name(&self) -> &str {
        self.dialect().name()
    }

    /// Build a fresh snapshot of the live schema.
    fn load_schema(&self) -> Result<Schema>;

    /// Run a query and return every row as text values.
    fn query(&self, sql: &str) -> Result<Vec<TextRow>>;

    /// Run one statement and return the number of affected rows.
    fn execute(&self, sql: &str) -> Result<usize>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.dialect().quote_identifier(table)
        );
        let rows = self.query(&sql)?;
        let count = rows
            .first()
            .and_then(|row| row.first().cloned().flatten())
            .unwrap_or_default();
        count.trim().parse::<u64>().map_err(|_| {
            MigrationError::invalid_input(format!("Unexpected row count for {}: '{}'", table, count))
        })
    }
}

/// DuckDB-backed connection
pub struct DuckDbConnection {
    id: ConnectionId,
    connection: duckdb::Connection,
    dialect: DuckDbDialect,
}

impl DuckDbConnection {
    /// Open (or create) a database file. The path doubles as the connection id.
    pub fn open(path: &Path, settings: &DuckDbSettings) -> Result<Self> {
        let connection = duckdb::Connection::open(path)?;
        let db = Self {
            id: ConnectionId::new(path.display().to_string()),
            connection,
            dialect: DuckDbDialect,
        };
        db.apply_settings(settings)?;
        log::debug!("Opened DuckDB database {}", path.display());
        Ok(db)
    }

    /// Open a private in-memory database under the given id.
    pub fn open_in_memory(id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            id: ConnectionId::new(id),
            connection: duckdb::Connection::open_in_memory()?,
            dialect: DuckDbDialect,
        })
    }

    fn apply_settings(&self, settings: &DuckDbSettings) -> Result<()> {
        if let Some(limit) = &settings.memory_limit {
            self.connection
                .execute_batch(&format!("SET memory_limit={}", self.dialect.quote_string(limit)))?;
        }
        if let Some(threads) = settings.threads {
            self.connection
                .execute_batch(&format!("SET threads={}", threads))?;
        }
        Ok(())
    }

    /// Run several `;`-separated statements at once (fixtures, setup scripts).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        log::debug!("Executing batch ({} bytes)", sql.len());
        self.connection.execute_batch(sql)?;
        Ok(())
    }
}

impl Connection for DuckDbConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn load_schema(&self) -> Result<Schema> {
        log::debug!("Loading schema of {}", self.id);
        introspect::load_schema(&self.connection)
    }

    fn query(&self, sql: &str) -> Result<Vec<TextRow>> {
        log::debug!("Query on {}: {}", self.id, sql.trim());
        let mut stmt = self.connection.prepare(sql)?;
        // Column metadata is only available once the statement has run
        let mut rows = stmt.query([])?;
        let width = rows
            .as_ref()
            .map(|s| s.column_names().len())
            .unwrap_or_default();
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(value_to_text(row.get_ref(i)?));
            }
            result.push(values);
        }
        Ok(result)
    }

    fn execute(&self, sql: &str) -> Result<usize> {
        log::debug!("Execute on {}: {}", self.id, sql.trim());
        Ok(self.connection.execute(sql, [])?)
    }

    fn begin(&self) -> Result<()> {
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.connection.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.connection.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Text form of a DuckDB value. Queries issued by the scanner already cast
/// every column to VARCHAR; the other arms cover ad-hoc queries.
fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    let text = match value {
        ValueRef::Null => return None,
        ValueRef::Boolean(b) => b.to_string(),
        ValueRef::TinyInt(i) => i.to_string(),
        ValueRef::SmallInt(i) => i.to_string(),
        ValueRef::Int(i) => i.to_string(),
        ValueRef::BigInt(i) => i.to_string(),
        ValueRef::HugeInt(i) => i.to_string(),
        ValueRef::UTinyInt(i) => i.to_string(),
        ValueRef::USmallInt(i) => i.to_string(),
        ValueRef::UInt(i) => i.to_string(),
        ValueRef::UBigInt(i) => i.to_string(),
        ValueRef::Float(f) => f.to_string(),
        ValueRef::Double(f) => f.to_string(),
        ValueRef::Decimal(d) => d.to_string(),
        ValueRef::Text(s) => String::from_utf8_lossy(s).to_string(),
        ValueRef::Blob(b) => String::from_utf8_lossy(b).to_string(),
        other => format!("{:?}", other),
    };
    Some(text)
}
