//! Statement expansion
//!
//! A statement points at a categorical variant, which may point at a
//! contextual variant (its defining context), which points at a sequence
//! reference. The categorical variant's `members` list usually contains the
//! defining context again, so members equal to it are written as a
//! `{"$ref": ...}` back-reference into the same document instead of being
//! inlined a second time.
//!
//! Expansion depth is fixed: sequence references and members are inlined one
//! level and never traversed further, so every statement terminates.

use serde_json::{json, Map, Value};
use crate::{Error, Result};
use crate::id::RecordId;
use crate::storage::RecordSource;
use super::resolver::{Resolver, ResolveStep};

const VARIANT: &str = "variant";
const DEFINING_CONTEXT: &str = "definingContext";
const MEMBERS: &str = "members";
const LOCATION: &str = "location";
const SEQUENCE_REFERENCE: &str = "sequenceReference";

/// A fully inlined statement document
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedStatement {
    /// Local key of the statement; output documents are keyed by it
    pub statement_id: String,
    pub document: Value,
    /// Whether the variant carried a defining context
    pub contextual: bool,
    /// Number of members replaced by a back-reference marker
    pub back_references: usize,
}

impl ExpandedStatement {
    /// `{statement_id: document}`, the shape of one NDJSON line
    pub fn into_keyed(self) -> Value {
        let mut keyed = Map::new();
        keyed.insert(self.statement_id, self.document);
        Value::Object(keyed)
    }
}

/// Builds inlined statement documents from a record source
pub struct Expander<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    resolver: Resolver<'a, S>,
}

impl<'a, S: RecordSource + ?Sized> Expander<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            resolver: Resolver::new(source),
        }
    }

    /// Fetch the statement stored under `record_id` and expand it
    pub fn expand_id(&self, record_id: &str) -> Result<ExpandedStatement> {
        let statement = self.source.get(record_id)?;
        self.expand(record_id, &statement)
    }

    /// Expand one statement.
    ///
    /// `record_id` is the statement's own identifier; the input value is not
    /// modified, a new document is returned.
    pub fn expand(&self, record_id: &str, statement: &Value) -> Result<ExpandedStatement> {
        let statement_id = RecordId::local_key_of(record_id);
        tracing::debug!("Processing {}...", statement_id);

        let Value::Object(statement) = statement else {
            return Err(malformed(statement_id, record_id, "statement is not a JSON object"));
        };
        let mut document = statement.clone();

        let variant_id = match document.get(VARIANT) {
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err(malformed(statement_id, record_id, "'variant' is not an identifier string")),
            None => return Err(malformed(statement_id, record_id, "missing 'variant'")),
        };
        let categorical = self.resolver.resolve(&variant_id, statement_id, ResolveStep::Variant)?;

        // Without a defining context the categorical variant is a leaf
        let mut categorical = match categorical {
            Value::Object(map) if map.contains_key(DEFINING_CONTEXT) => map,
            leaf => {
                document.insert(VARIANT.to_string(), leaf);
                return Ok(ExpandedStatement {
                    statement_id: statement_id.to_string(),
                    document: Value::Object(document),
                    contextual: false,
                    back_references: 0,
                });
            }
        };

        let context_id = match categorical.get(DEFINING_CONTEXT) {
            Some(Value::String(id)) => id.clone(),
            _ => {
                return Err(malformed(
                    statement_id,
                    &variant_id,
                    "'definingContext' is not an identifier string",
                ))
            }
        };
        let contextual = self.resolver.resolve(&context_id, statement_id, ResolveStep::DefiningContext)?;
        let contextual = self.inline_sequence_reference(contextual, &context_id, statement_id)?;
        categorical.insert(DEFINING_CONTEXT.to_string(), contextual);

        let mut back_references = 0;
        let members = match categorical.get(MEMBERS) {
            Some(members) => Some(self.expand_members(members, &context_id, &variant_id, statement_id)?),
            None => None,
        };
        if let Some((members, refs)) = members {
            back_references = refs;
            categorical.insert(MEMBERS.to_string(), Value::Array(members));
        }

        document.insert(VARIANT.to_string(), Value::Object(categorical));

        Ok(ExpandedStatement {
            statement_id: statement_id.to_string(),
            document: Value::Object(document),
            contextual: true,
            back_references,
        })
    }

    /// Replace `location.sequenceReference` of a contextual variant with the
    /// record it names
    fn inline_sequence_reference(&self, contextual: Value, context_id: &str, statement_id: &str) -> Result<Value> {
        let Value::Object(mut contextual) = contextual else {
            return Err(malformed(statement_id, context_id, "contextual variant is not a JSON object"));
        };

        let Some(Value::Object(location)) = contextual.get_mut(LOCATION) else {
            return Err(malformed(statement_id, context_id, "missing 'location.sequenceReference'"));
        };
        let sequence_id = match location.get(SEQUENCE_REFERENCE) {
            Some(Value::String(id)) => id.clone(),
            Some(_) => {
                return Err(malformed(
                    statement_id,
                    context_id,
                    "'location.sequenceReference' is not an identifier string",
                ))
            }
            None => return Err(malformed(statement_id, context_id, "missing 'location.sequenceReference'")),
        };

        let sequence = self.resolver.resolve(&sequence_id, statement_id, ResolveStep::SequenceReference)?;
        location.insert(SEQUENCE_REFERENCE.to_string(), sequence);

        Ok(Value::Object(contextual))
    }

    /// Resolve members in order, substituting the back-reference marker for
    /// the defining context. Returns the new list and the marker count.
    fn expand_members(
        &self,
        members: &Value,
        context_id: &str,
        variant_id: &str,
        statement_id: &str,
    ) -> Result<(Vec<Value>, usize)> {
        let Value::Array(members) = members else {
            return Err(malformed(statement_id, variant_id, "'members' is not an array"));
        };

        let mut expanded = Vec::with_capacity(members.len());
        let mut back_references = 0;

        for (i, member) in members.iter().enumerate() {
            let Value::String(member_id) = member else {
                return Err(malformed(
                    statement_id,
                    variant_id,
                    format!("members[{}] is not an identifier string", i),
                ));
            };

            // compared on the raw identifier, before resolution
            if member_id == context_id {
                expanded.push(back_reference(statement_id));
                back_references += 1;
            } else {
                expanded.push(self.resolver.resolve(member_id, statement_id, ResolveStep::Member(i))?);
            }
        }

        Ok((expanded, back_references))
    }
}

/// `{"$ref": "#/<statement>/variant/definingContext"}`
///
/// The statement id is escaped as a JSON Pointer token (`~` -> `~0`,
/// `/` -> `~1`), so ids containing either character differ from the raw id.
/// Ids without them, such as `SCV000927861.1`, are written unchanged.
pub fn back_reference(statement_id: &str) -> Value {
    json!({ "$ref": format!("#/{}/{}/{}", escape_pointer_token(statement_id), VARIANT, DEFINING_CONTEXT) })
}

/// Escape a JSON Pointer reference token (RFC 6901)
fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn malformed(statement: &str, record: &str, reason: impl Into<String>) -> Error {
    Error::MalformedRecord {
        statement: statement.to_string(),
        record: record.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{Namespace, RecordId};
    use crate::storage::{RecordIndex, RecordStore};

    /// Insert a fixture record; a key collision would silently keep the old value
    fn put(store: &RecordStore, namespace: Namespace, key: &str, value: Value) {
        assert!(
            store.put(&RecordId::new(namespace, key), &value).unwrap(),
            "fixture key {}.json#/{} already present",
            namespace,
            key
        );
    }

    /// Store from the S1 walkthrough: X1 is both the defining context and a member
    fn scenario_store() -> RecordStore {
        let store = RecordStore::open_in_memory().unwrap();
        put(&store, Namespace::Stmts, "S1", json!({"variant": "catvars.json#/C1"}));
        put(&store, Namespace::Catvars, "C1", json!({
            "definingContext": "ctxvars.json#/X1",
            "members": ["ctxvars.json#/X1", "ctxvars.json#/X2"]
        }));
        put(&store, Namespace::Ctxvars, "X1", json!({"location": {"sequenceReference": "seqrefs.json#/SEQ1"}}));
        put(&store, Namespace::Ctxvars, "X2", json!({"foo": "bar"}));
        put(&store, Namespace::Seqrefs, "SEQ1", json!({"seq": "ACGT"}));
        store
    }

    #[test]
    fn test_end_to_end_scenario() {
        let store = scenario_store();
        let expander = Expander::new(&store);

        let expanded = expander.expand_id("stmts.json#/S1").unwrap();
        assert_eq!(expanded.statement_id, "S1");
        assert!(expanded.contextual);
        assert_eq!(expanded.back_references, 1);

        let variant = &expanded.document["variant"];
        assert_eq!(
            variant["definingContext"]["location"]["sequenceReference"],
            json!({"seq": "ACGT"})
        );
        assert_eq!(
            variant["members"],
            json!([{"$ref": "#/S1/variant/definingContext"}, {"foo": "bar"}])
        );
    }

    #[test]
    fn test_leaf_variant_is_inlined_verbatim() {
        let store = RecordStore::open_in_memory().unwrap();
        let categorical = json!({
            "type": "CategoricalVariant",
            "members": ["ctxvars.json#/not-loaded"]
        });
        put(&store, Namespace::Catvars, "C9", categorical.clone());

        let statement = json!({"id": "S9", "variant": "catvars.json#/C9"});
        let expanded = Expander::new(&store).expand("stmts.json#/S9", &statement).unwrap();

        // members of a leaf are left alone, so the unloaded member is not an error
        assert_eq!(expanded.document["variant"], categorical);
        assert_eq!(expanded.document["id"], json!("S9"));
        assert!(!expanded.contextual);
        assert_eq!(expanded.back_references, 0);
    }

    #[test]
    fn test_non_object_variant_is_a_leaf() {
        let store = RecordStore::open_in_memory().unwrap();
        put(&store, Namespace::Catvars, "C1", json!("opaque"));

        let statement = json!({"variant": "catvars.json#/C1"});
        let expanded = Expander::new(&store).expand("stmts.json#/S1", &statement).unwrap();
        assert_eq!(expanded.document, json!({"variant": "opaque"}));
    }

    #[test]
    fn test_contextual_without_members() {
        let store = scenario_store();
        put(&store, Namespace::Catvars, "C2", json!({"definingContext": "ctxvars.json#/X1"}));

        let statement = json!({"variant": "catvars.json#/C2"});
        let expanded = Expander::new(&store).expand("stmts.json#/S2", &statement).unwrap();

        let variant = expanded.document["variant"].as_object().unwrap();
        assert!(!variant.contains_key("members"));
        assert_eq!(
            variant["definingContext"],
            json!({"location": {"sequenceReference": {"seq": "ACGT"}}})
        );
    }

    #[test]
    fn test_only_defining_context_members_become_refs() {
        let store = scenario_store();
        put(&store, Namespace::Ctxvars, "X3", json!({"location": {"sequenceReference": "seqrefs.json#/SEQ1"}}));
        put(&store, Namespace::Catvars, "C3", json!({
            "definingContext": "ctxvars.json#/X1",
            "members": ["ctxvars.json#/X2", "ctxvars.json#/X3", "ctxvars.json#/X1"]
        }));

        let statement = json!({"variant": "catvars.json#/C3"});
        let expanded = Expander::new(&store).expand("stmts.json#/S3", &statement).unwrap();

        let members = expanded.document["variant"]["members"].as_array().unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members[0], json!({"foo": "bar"}));
        // members are inlined one level: X3's sequence reference stays an identifier
        assert_eq!(members[1], json!({"location": {"sequenceReference": "seqrefs.json#/SEQ1"}}));
        assert_eq!(members[2], json!({"$ref": "#/S3/variant/definingContext"}));

        let refs = members.iter().filter(|m| m.get("$ref").is_some()).count();
        assert_eq!(refs, 1);
    }

    #[test]
    fn test_missing_variant_target() {
        let store = RecordStore::open_in_memory().unwrap();
        let statement = json!({"variant": "catvars.json#/absent"});

        let err = Expander::new(&store).expand("stmts.json#/S1", &statement).unwrap_err();
        match err {
            Error::MissingReference { statement, step, id } => {
                assert_eq!(statement, "S1");
                assert_eq!(step, ResolveStep::Variant);
                assert_eq!(id, "catvars.json#/absent");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_targets_report_their_step() {
        let cases = [
            ("M1", json!({"definingContext": "ctxvars.json#/gone"}), ResolveStep::DefiningContext, "ctxvars.json#/gone"),
            ("M2", json!({"definingContext": "ctxvars.json#/X4"}), ResolveStep::SequenceReference, "seqrefs.json#/gone"),
            (
                "M3",
                json!({"definingContext": "ctxvars.json#/X1", "members": ["ctxvars.json#/X1", "ctxvars.json#/gone"]}),
                ResolveStep::Member(1),
                "ctxvars.json#/gone",
            ),
        ];

        for (key, categorical, expected_step, expected_id) in cases {
            let store = scenario_store();
            put(&store, Namespace::Ctxvars, "X4", json!({"location": {"sequenceReference": "seqrefs.json#/gone"}}));
            put(&store, Namespace::Catvars, key, categorical);

            let statement = json!({"variant": format!("catvars.json#/{}", key)});
            let err = Expander::new(&store).expand("stmts.json#/T", &statement).unwrap_err();
            match err {
                Error::MissingReference { step, id, .. } => {
                    assert_eq!(step, expected_step);
                    assert_eq!(id, expected_id);
                }
                other => panic!("unexpected error for {key}: {other}"),
            }
        }
    }

    #[test]
    fn test_contextual_without_sequence_reference_is_malformed() {
        let store = scenario_store();
        put(&store, Namespace::Ctxvars, "X5", json!({"location": {"start": 1}}));
        put(&store, Namespace::Catvars, "C5", json!({"definingContext": "ctxvars.json#/X5"}));

        let statement = json!({"variant": "catvars.json#/C5"});
        let err = Expander::new(&store).expand("stmts.json#/S5", &statement).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { ref record, .. } if record == "ctxvars.json#/X5"));
        assert!(err.is_statement_error());
    }

    #[test]
    fn test_statement_without_variant_is_malformed() {
        let store = RecordStore::open_in_memory().unwrap();
        let err = Expander::new(&store)
            .expand("stmts.json#/S1", &json!({"id": "S1"}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
        assert_eq!(err.statement_id(), Some("S1"));
    }

    #[test]
    fn test_non_string_member_is_malformed() {
        let store = scenario_store();
        put(&store, Namespace::Catvars, "C6", json!({"definingContext": "ctxvars.json#/X1", "members": [42]}));

        let statement = json!({"variant": "catvars.json#/C6"});
        let err = Expander::new(&store).expand("stmts.json#/S6", &statement).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { ref reason, .. } if reason.contains("members[0]")));
    }

    #[test]
    fn test_store_and_input_are_untouched() {
        let store = scenario_store();
        let statement = store.get("stmts.json#/S1").unwrap();

        Expander::new(&store).expand("stmts.json#/S1", &statement).unwrap();

        assert_eq!(statement, json!({"variant": "catvars.json#/C1"}));
        assert_eq!(
            store.get("ctxvars.json#/X1").unwrap(),
            json!({"location": {"sequenceReference": "seqrefs.json#/SEQ1"}})
        );
    }

    #[test]
    fn test_field_order_is_preserved() {
        let store = scenario_store();
        let statement = json!({"id": "S1", "variant": "catvars.json#/C1", "direction": "supports"});

        let expanded = Expander::new(&store).expand("stmts.json#/S1", &statement).unwrap();
        let keys: Vec<&String> = expanded.document.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["id", "variant", "direction"]);
    }

    #[test]
    fn test_index_and_store_agree() {
        let store = scenario_store();
        let index = RecordIndex::build_from_store(&store).unwrap();

        let from_store = Expander::new(&store).expand_id("stmts.json#/S1").unwrap();
        let from_index = Expander::new(&index).expand_id("stmts.json#/S1").unwrap();
        assert_eq!(from_store, from_index);
    }

    #[test]
    fn test_back_reference_escapes_pointer_tokens() {
        assert_eq!(
            back_reference("SCV000927861.1"),
            json!({"$ref": "#/SCV000927861.1/variant/definingContext"})
        );
        assert_eq!(back_reference("a~b"), json!({"$ref": "#/a~0b/variant/definingContext"}));
    }

    #[test]
    fn test_into_keyed() {
        let store = scenario_store();
        let keyed = Expander::new(&store).expand_id("stmts.json#/S1").unwrap().into_keyed();
        assert!(keyed.get("S1").is_some());
        assert_eq!(keyed.as_object().unwrap().len(), 1);
    }
}
