//! # vrs-inline - Reference inliner for VRS statement graphs
//!
//! Turns four flat, cross-referencing JSON collections into one self-contained
//! document per statement.
//!
//! vrs-inline provides:
//! - Namespaced record identifiers (`<namespace>.json#/<local key>`)
//! - SQLite-backed record store with first-write-wins loading
//! - Reference resolution with attributable errors
//! - Statement expansion with back-reference markers for the defining context
//! - Batch driver producing a keyed mapping or newline-delimited documents

pub mod id;
pub mod storage;
pub mod inline;
pub mod input;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use id::{Namespace, RecordId};
pub use storage::{RecordIndex, RecordSource, RecordStore};
pub use inline::{
    BatchDriver, BatchOptions, BatchStats, ErrorPolicy, ExpandedStatement, Expander, OutputFormat,
    ResolveStep, Resolver,
};

/// Result type alias for vrs-inline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for vrs-inline operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Statement {statement}: missing reference '{id}' at {step}")]
    MissingReference {
        statement: String,
        step: ResolveStep,
        id: String,
    },

    #[error("Statement {statement}: malformed record '{record}': {reason}")]
    MalformedRecord {
        statement: String,
        record: String,
        reason: String,
    },

    #[error("Expansion worker panicked")]
    WorkerPanicked,
}

impl Error {
    /// True for failures scoped to a single statement.
    ///
    /// These are the only errors a batch may skip past; anything else means
    /// the run itself is broken.
    pub fn is_statement_error(&self) -> bool {
        matches!(self, Error::MissingReference { .. } | Error::MalformedRecord { .. })
    }

    /// Statement the failure is attributed to, if any
    pub fn statement_id(&self) -> Option<&str> {
        match self {
            Error::MissingReference { statement, .. } | Error::MalformedRecord { statement, .. } => {
                Some(statement)
            }
            _ => None,
        }
    }
}
