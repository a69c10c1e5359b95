//! Reference resolution
//!
//! Every lookup is attributed to the statement being expanded and the field
//! that held the reference, so a missing record can be traced back to its
//! source.

use std::fmt;
use serde_json::Value;
use crate::{Error, Result};
use crate::storage::RecordSource;

/// Field of a statement document that held a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStep {
    /// `variant` -> categorical variant
    Variant,
    /// `variant.definingContext` -> contextual variant
    DefiningContext,
    /// `variant.definingContext.location.sequenceReference` -> sequence reference
    SequenceReference,
    /// `variant.members[i]` -> contextual variant
    Member(usize),
}

impl ResolveStep {
    /// Dotted path of the referencing field within the statement
    pub fn field_path(&self) -> String {
        match self {
            Self::Variant => "variant".to_string(),
            Self::DefiningContext => "variant.definingContext".to_string(),
            Self::SequenceReference => "variant.definingContext.location.sequenceReference".to_string(),
            Self::Member(i) => format!("variant.members[{}]", i),
        }
    }
}

impl fmt::Display for ResolveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_path())
    }
}

/// Resolves identifiers against a record source
pub struct Resolver<'a, S: RecordSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: RecordSource + ?Sized> Resolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Resolve `id`, failing with [`Error::MissingReference`] when it is absent
    pub fn resolve(&self, id: &str, statement: &str, step: ResolveStep) -> Result<Value> {
        self.source.find(id)?.ok_or_else(|| Error::MissingReference {
            statement: statement.to_string(),
            step,
            id: id.to_string(),
        })
    }
}
