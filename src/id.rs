//! Record identifiers - namespaced keys for every record in a run
//!
//! Format: `<namespace>.json#/<local key>`
//!
//! Examples:
//! - `stmts.json#/SCV000927861.1`
//! - `ctxvars.json#/NC_000021.8:g.36259383C>T`
//! - `seqrefs.json#/NC_000021.9`
//!
//! The prefix is part of the key itself, so identifiers embedded inside record
//! bodies can be looked up directly without inferring a namespace.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the namespace file name and the local key
const FRAGMENT_SEPARATOR: &str = ".json#/";

/// The four source collections a run is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Statements - one output document each
    Stmts,
    /// Sequence references - opaque leaves
    Seqrefs,
    /// Categorical variants
    Catvars,
    /// Contextual variants
    Ctxvars,
}

impl Namespace {
    /// Get the string representation of the namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Stmts => "stmts",
            Namespace::Seqrefs => "seqrefs",
            Namespace::Catvars => "catvars",
            Namespace::Ctxvars => "ctxvars",
        }
    }

    /// Prefix every identifier in this namespace starts with, e.g. `catvars.json#`
    pub fn prefix(&self) -> String {
        format!("{}.json#", self.as_str())
    }

    /// Conventional file name for this collection inside an input directory
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    /// Human-readable collection name
    pub fn label(&self) -> &'static str {
        match self {
            Namespace::Stmts => "Statements",
            Namespace::Seqrefs => "Sequence references",
            Namespace::Catvars => "Categorical variants",
            Namespace::Ctxvars => "Contextual variants",
        }
    }

    /// Get all namespaces
    pub fn all() -> &'static [Namespace] {
        &[
            Namespace::Stmts,
            Namespace::Seqrefs,
            Namespace::Catvars,
            Namespace::Ctxvars,
        ]
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // identifiers carry the exact lowercase name
        match s {
            "stmts" => Ok(Namespace::Stmts),
            "seqrefs" => Ok(Namespace::Seqrefs),
            "catvars" => Ok(Namespace::Catvars),
            "ctxvars" => Ok(Namespace::Ctxvars),
            _ => Err(Error::InvalidId(format!("Unknown namespace: {}", s))),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Namespaced identifier of one stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Collection the record came from
    pub namespace: Namespace,
    /// Key of the record inside its source collection
    pub local_key: String,
}

impl RecordId {
    pub fn new(namespace: Namespace, local_key: impl Into<String>) -> Self {
        Self {
            namespace,
            local_key: local_key.into(),
        }
    }

    /// Parse an identifier string
    ///
    /// Expected format: `<namespace>.json#/<local key>`
    pub fn parse(id: &str) -> Result<Self> {
        let (namespace, local_key) = id.split_once(FRAGMENT_SEPARATOR).ok_or_else(|| {
            Error::InvalidId(format!("Identifier must contain '{}': {}", FRAGMENT_SEPARATOR, id))
        })?;

        if local_key.is_empty() {
            return Err(Error::InvalidId(format!("Identifier has an empty local key: {}", id)));
        }

        Ok(Self {
            namespace: Namespace::from_str(namespace)?,
            local_key: local_key.to_string(),
        })
    }

    /// Convert to the identifier string used as the store key
    pub fn to_id_string(&self) -> String {
        format!("{}/{}", self.namespace.prefix(), self.local_key)
    }

    /// Local-key portion of a raw identifier: everything after the last `/`.
    ///
    /// Output documents are keyed by this value.
    pub fn local_key_of(id: &str) -> &str {
        id.rsplit('/').next().unwrap_or(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_id_string())
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_id_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = RecordId::new(Namespace::Ctxvars, "NC_000021.8:g.36259383C>T");
        assert_eq!(id.to_id_string(), "ctxvars.json#/NC_000021.8:g.36259383C>T");
        assert_eq!(RecordId::parse(&id.to_id_string()).unwrap(), id);
    }

    #[test]
    fn test_id_parse() {
        let id = RecordId::parse("catvars.json#/1153275").unwrap();
        assert_eq!(id.namespace, Namespace::Catvars);
        assert_eq!(id.local_key, "1153275");

        // keys keep everything after the separator, slashes included
        let id = RecordId::parse("seqrefs.json#/a/b").unwrap();
        assert_eq!(id.local_key, "a/b");
    }

    #[test]
    fn test_invalid_id() {
        assert!(RecordId::parse("invalid").is_err());
        assert!(RecordId::parse("other.json#/x").is_err());
        assert!(RecordId::parse("stmts.json#/").is_err());
    }

    #[test]
    fn test_local_key_of() {
        assert_eq!(RecordId::local_key_of("stmts.json#/SCV000927861.1"), "SCV000927861.1");
        assert_eq!(RecordId::local_key_of("stmts.json#/a/b"), "b");
        assert_eq!(RecordId::local_key_of("bare"), "bare");
    }

    #[test]
    fn test_namespace_from_str() {
        for ns in Namespace::all() {
            assert_eq!(ns.as_str().parse::<Namespace>().unwrap(), *ns);
        }
        assert!("STMTS".parse::<Namespace>().is_err());
        assert!("contextual".parse::<Namespace>().is_err());
        assert!("genes".parse::<Namespace>().is_err());
    }

    #[test]
    fn test_parse_requires_exact_namespace() {
        assert!(RecordId::parse("STMTS.json#/S1").is_err());
        assert!(RecordId::parse("statements.json#/S1").is_err());

        let id = RecordId::parse("stmts.json#/S1").unwrap();
        assert_eq!(id.to_id_string(), "stmts.json#/S1");
    }

    #[test]
    fn test_serde_as_string() {
        let id = RecordId::new(Namespace::Seqrefs, "NC_000021.9");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"seqrefs.json#/NC_000021.9\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
