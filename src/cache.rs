//! Per-run schema snapshot cache keyed by connection id

use crate::connection::{Connection, ConnectionId};
use crate::error::Result;
use crate::schema::Schema;
use std::collections::HashMap;
use std::rc::Rc;

/// Schema snapshots loaded during one migration run.
///
/// Entries never expire on their own: after running DDL against a connection
/// the caller must [`invalidate`](SchemaCache::invalidate) it.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: HashMap<ConnectionId, Rc<Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot for `conn`, loading it on first use.
    pub fn get(&mut self, conn: &dyn Connection) -> Result<Rc<Schema>> {
        if let Some(schema) = self.schemas.get(conn.id()) {
            return Ok(Rc::clone(schema));
        }
        let schema = Rc::new(conn.load_schema()?);
        self.schemas.insert(conn.id().clone(), Rc::clone(&schema));
        Ok(schema)
    }

    /// Forget the snapshot of one connection. Returns whether one was cached.
    pub fn invalidate(&mut self, id: &ConnectionId) -> bool {
        self.schemas.remove(id).is_some()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.schemas.contains_key(id)
    }
}
