/// Events a batch run reports while it expands statements
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressMessage {
    Started {
        total: usize,
    },
    Expanded {
        statement_id: String,
    },
    Skipped {
        statement_id: String,
        reason: String,
    },
    Finished,
    Error(String),
}
