//! Immutable in-memory snapshot of a record store
//!
//! A SQLite connection cannot be shared between threads, so parallel
//! expansion reads from this snapshot instead.

use std::collections::HashMap;
use serde_json::Value;
use crate::Result;
use super::{RecordSource, RecordStore};

/// Parsed records keyed by identifier
#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    records: HashMap<String, Value>,
}

impl RecordIndex {
    /// Build the index from every record in the store
    pub fn build_from_store(store: &RecordStore) -> Result<Self> {
        let mut records = HashMap::new();
        for (id, body) in store.all_records()? {
            records.insert(id, serde_json::from_str(&body)?);
        }
        tracing::debug!("Built record index with {} entries", records.len());
        Ok(Self { records })
    }

    /// Borrow a record without cloning it
    pub fn get_ref(&self, id: &str) -> Option<&Value> {
        self.records.get(id)
    }
}

impl RecordSource for RecordIndex {
    fn find(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.get_ref(id).cloned())
    }
}
