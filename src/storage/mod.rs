//! Storage Layer - SQLite-backed record store
//!
//! System of record is an in-memory SQLite database with one table:
//! - records(id, namespace, local_key, body)
//!
//! The store is populated once per run and read-only afterwards.
//! [`RecordIndex`] is an immutable snapshot of it that can be shared
//! across threads.

pub mod schema;
pub mod sqlite;
pub mod index;

pub use sqlite::{RecordStore, LoadStats, StoreStats};
pub use index::RecordIndex;

use crate::{Error, Result};
use serde_json::Value;

/// Anything identifiers can be looked up in.
pub trait RecordSource {
    /// Look up the parsed value stored under `id`
    fn find(&self, id: &str) -> Result<Option<Value>>;

    /// Like [`RecordSource::find`], but a miss is an error
    fn get(&self, id: &str) -> Result<Value> {
        self.find(id)?
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }
}
