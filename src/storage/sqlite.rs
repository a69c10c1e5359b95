//! SQLite storage implementation

use std::fmt;
use rusqlite::{Connection, params, OptionalExtension};
use serde_json::{Map, Value};
use crate::Result;
use crate::id::{Namespace, RecordId};
use super::{schema, RecordSource};

/// SQLite-backed store for one run's records.
///
/// Lives in memory only: it is created fresh, loaded once, queried many
/// times and dropped at the end of the run.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open an empty in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Record Operations ==========

    /// Insert a record unless its identifier is already present.
    ///
    /// Returns `false` when the identifier existed; the stored value is left
    /// untouched (first write wins).
    pub fn put(&self, id: &RecordId, value: &Value) -> Result<bool> {
        let body = serde_json::to_string(value)?;
        let changed = self.conn.execute(
            r#"
            INSERT INTO records (id, namespace, local_key, body)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO NOTHING
            "#,
            params![
                id.to_id_string(),
                id.namespace.as_str(),
                id.local_key,
                body,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Get the raw JSON text stored under an identifier
    pub fn get_raw(&self, id: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT body FROM records WHERE id = ?1", [id], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Load every key/value pair of a collection object under `namespace`
    pub fn load_collection(&self, source: &Map<String, Value>, namespace: Namespace) -> Result<LoadStats> {
        let mut stats = LoadStats::new(namespace);

        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in source {
            let id = RecordId::new(namespace, key.as_str());
            if self.put(&id, value)? {
                stats.inserted += 1;
            } else {
                tracing::debug!("Ignoring duplicate record {}", id);
                stats.duplicates += 1;
            }
        }
        tx.commit()?;

        if stats.duplicates > 0 {
            tracing::warn!("{} duplicate keys in {}; first value kept", stats.duplicates, namespace);
        }
        tracing::info!("Loaded {} {} ({} duplicates ignored)", stats.inserted, namespace, stats.duplicates);
        Ok(stats)
    }

    /// Identifiers of every record in a namespace, in insertion order
    pub fn ids_in(&self, namespace: Namespace) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM records WHERE namespace = ?1 ORDER BY rowid"
        )?;

        let ids = stmt
            .query_map([namespace.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(ids)
    }

    /// Identifiers of every statement, in insertion order
    pub fn statement_ids(&self) -> Result<Vec<String>> {
        self.ids_in(Namespace::Stmts)
    }

    /// All `(id, raw body)` pairs, in insertion order
    pub fn all_records(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare("SELECT id, body FROM records ORDER BY rowid")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(String, String)>>>()?;

        Ok(rows)
    }

    /// Count all records
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count records in one namespace
    pub fn count_in(&self, namespace: Namespace) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE namespace = ?1",
            [namespace.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            statements: self.count_in(Namespace::Stmts)?,
            categorical: self.count_in(Namespace::Catvars)?,
            contextual: self.count_in(Namespace::Ctxvars)?,
            sequences: self.count_in(Namespace::Seqrefs)?,
        })
    }
}

impl RecordSource for RecordStore {
    fn find(&self, id: &str) -> Result<Option<Value>> {
        match self.get_raw(id)? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }
}

/// Outcome of loading one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub namespace: Namespace,
    pub inserted: usize,
    pub duplicates: usize,
}

impl LoadStats {
    pub fn new(namespace: Namespace) -> Self {
        Self { namespace, inserted: 0, duplicates: 0 }
    }
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} loaded, {} duplicates ignored",
            self.namespace.label(),
            self.inserted,
            self.duplicates
        )
    }
}

/// Record store statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub statements: usize,
    pub categorical: usize,
    pub contextual: usize,
    pub sequences: usize,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.statements + self.categorical + self.contextual + self.sequences
    }
}
