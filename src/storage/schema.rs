//! Database schema definitions

/// SQL to create the records table
///
/// `id` is the full namespaced identifier; `body` holds the raw JSON text.
pub const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    namespace TEXT NOT NULL,
    local_key TEXT NOT NULL,
    body TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_records_namespace ON records(namespace)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_RECORDS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
