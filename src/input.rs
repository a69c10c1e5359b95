//! Input collections - the four JSON object files a run is built from
//!
//! Each file is a JSON object keyed by local identifier. Loading reads and
//! parses them and hands each object to [`RecordStore::load_collection`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use serde_json::Value;
use crate::{Error, Result};
use crate::id::Namespace;
use crate::storage::{LoadStats, RecordStore};

/// Paths of the four input collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSet {
    pub statements: PathBuf,
    pub categorical: PathBuf,
    pub contextual: PathBuf,
    pub sequences: PathBuf,
}

impl InputSet {
    /// Conventional layout: `<dir>/stmts.json`, `catvars.json`, `ctxvars.json`, `seqrefs.json`
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            statements: dir.join(Namespace::Stmts.file_name()),
            categorical: dir.join(Namespace::Catvars.file_name()),
            contextual: dir.join(Namespace::Ctxvars.file_name()),
            sequences: dir.join(Namespace::Seqrefs.file_name()),
        }
    }

    pub fn path(&self, namespace: Namespace) -> &Path {
        match namespace {
            Namespace::Stmts => &self.statements,
            Namespace::Catvars => &self.categorical,
            Namespace::Ctxvars => &self.contextual,
            Namespace::Seqrefs => &self.sequences,
        }
    }

    /// `(namespace, path)` pairs in load order
    pub fn iter(&self) -> impl Iterator<Item = (Namespace, &Path)> {
        Namespace::all().iter().map(move |ns| (*ns, self.path(*ns)))
    }
}

/// Read one collection file. It must hold a JSON object.
pub fn read_collection(path: &Path) -> Result<serde_json::Map<String, Value>> {
    let file = File::open(path)
        .map_err(|e| Error::InvalidInput(format!("Cannot open {}: {}", path.display(), e)))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidInput(format!(
            "{} must contain a JSON object keyed by identifier",
            path.display()
        ))),
    }
}

/// Load every collection of `inputs` into `store`
pub fn load_inputs(store: &RecordStore, inputs: &InputSet) -> Result<Vec<LoadStats>> {
    let mut stats = Vec::with_capacity(Namespace::all().len());
    for (namespace, path) in inputs.iter() {
        tracing::info!("Reading {} from {}", namespace.label().to_lowercase(), path.display());
        let collection = read_collection(path)?;
        stats.push(store.load_collection(&collection, namespace)?);
    }
    Ok(stats)
}
