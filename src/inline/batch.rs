//! Batch driver
//!
//! Expands every statement in the store and materializes the results either
//! as one JSON object keyed by statement id or as newline-delimited
//! `{statement_id: document}` lines. Both shapes are built from the same
//! sequence of expansions.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use crate::{Error, Result};
use crate::id::Namespace;
use crate::storage::{RecordIndex, RecordStore};
use crate::ui::ProgressMessage;
use super::expander::{Expander, ExpandedStatement};

/// Indent used for pretty-printed unified output
const PRETTY_INDENT: &[u8] = b"    ";

/// Output document shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object mapping statement id to document
    #[default]
    Json,
    /// One `{statement_id: document}` object per line
    Ndjson,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Ndjson => "ndjson",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "ndjson" | "jsonl" => Ok(OutputFormat::Ndjson),
            _ => Err(Error::InvalidInput(format!("Unknown output format: {}", s))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do when a single statement fails to expand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the batch at the first failing statement
    #[default]
    Abort,
    /// Log the failure, leave the statement out and continue
    Skip,
}

/// Batch driver settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub on_error: ErrorPolicy,
    /// Worker threads used for expansion; 1 expands lazily on the caller's thread
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::Abort,
            jobs: 1,
        }
    }
}

/// Counters for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub expanded: usize,
    pub skipped: usize,
    pub leaf: usize,
    pub contextual: usize,
    pub back_references: usize,
}

impl BatchStats {
    fn record(&mut self, expanded: &ExpandedStatement) {
        self.expanded += 1;
        if expanded.contextual {
            self.contextual += 1;
        } else {
            self.leaf += 1;
        }
        self.back_references += expanded.back_references;
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch Stats:")?;
        writeln!(f, "  Statements: {}", self.total)?;
        writeln!(f, "  ✅ Expanded: {}", self.expanded)?;
        writeln!(f, "  ⏭️  Skipped: {}", self.skipped)?;
        writeln!(f, "  Leaf variants: {}", self.leaf)?;
        writeln!(f, "  With defining context: {}", self.contextual)?;
        writeln!(f, "  Back-references: {}", self.back_references)
    }
}

/// Drives expansion of every statement in a record store
pub struct BatchDriver<'a> {
    store: &'a RecordStore,
    options: BatchOptions,
    progress: Option<Sender<ProgressMessage>>,
}

impl<'a> BatchDriver<'a> {
    pub fn new(store: &'a RecordStore, options: BatchOptions) -> Self {
        Self {
            store,
            options,
            progress: None,
        }
    }

    /// Report progress over a channel
    pub fn with_progress(mut self, tx: Sender<ProgressMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Lazily expand every statement, in store order.
    ///
    /// Each item is independent: a failure for one statement does not stop
    /// the iterator.
    pub fn expand_all(&self) -> Result<impl Iterator<Item = Result<ExpandedStatement>> + '_> {
        let ids = self.store.statement_ids()?;
        let expander = Expander::new(self.store);
        Ok(ids.into_iter().map(move |id| expander.expand_id(&id)))
    }

    /// Expand every statement on `jobs` threads.
    ///
    /// Results come back in store order regardless of which worker produced
    /// them.
    pub fn expand_parallel(&self, jobs: usize) -> Result<Vec<Result<ExpandedStatement>>> {
        let ids = self.store.statement_ids()?;
        let index = RecordIndex::build_from_store(self.store)?;
        let chunk_size = ids.len().div_ceil(jobs.max(1)).max(1);
        let mut results = Vec::with_capacity(ids.len());

        thread::scope(|scope| {
            let index = &index;
            let handles: Vec<_> = ids
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        let expander = Expander::new(index);
                        chunk.iter().map(|id| expander.expand_id(id)).collect::<Vec<_>>()
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(chunk) => results.extend(chunk),
                    Err(_) => results.push(Err(Error::WorkerPanicked)),
                }
            }
        });

        Ok(results)
    }

    fn sequence(&self) -> Result<Box<dyn Iterator<Item = Result<ExpandedStatement>> + '_>> {
        if self.options.jobs > 1 {
            tracing::debug!("Expanding on {} threads", self.options.jobs);
            Ok(Box::new(self.expand_parallel(self.options.jobs)?.into_iter()))
        } else {
            Ok(Box::new(self.expand_all()?))
        }
    }

    /// Feed every successful expansion to `sink`, applying the error policy
    pub fn for_each<F>(&self, mut sink: F) -> Result<BatchStats>
    where
        F: FnMut(ExpandedStatement) -> Result<()>,
    {
        let total = self.store.count_in(Namespace::Stmts)?;
        let mut stats = BatchStats { total, ..Default::default() };
        self.notify(ProgressMessage::Started { total });

        for result in self.sequence()? {
            match result {
                Ok(expanded) => {
                    stats.record(&expanded);
                    self.notify(ProgressMessage::Expanded {
                        statement_id: expanded.statement_id.clone(),
                    });
                    sink(expanded)?;
                }
                Err(e) if e.is_statement_error() && self.options.on_error == ErrorPolicy::Skip => {
                    tracing::warn!("Skipping statement: {}", e);
                    stats.skipped += 1;
                    self.notify(ProgressMessage::Skipped {
                        statement_id: e.statement_id().unwrap_or_default().to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    self.notify(ProgressMessage::Error(e.to_string()));
                    return Err(e);
                }
            }
        }

        self.notify(ProgressMessage::Finished);
        Ok(stats)
    }

    /// Collect every document into one mapping keyed by statement id
    pub fn collect_map(&self) -> Result<(Map<String, Value>, BatchStats)> {
        let mut documents = Map::new();
        let stats = self.for_each(|expanded| {
            if documents.contains_key(&expanded.statement_id) {
                tracing::warn!("Statement id {} appears twice; keeping the later document", expanded.statement_id);
            }
            documents.insert(expanded.statement_id, expanded.document);
            Ok(())
        })?;
        Ok((documents, stats))
    }

    /// Stream one `{statement_id: document}` line per statement
    pub fn write_ndjson<W: Write>(&self, mut writer: W) -> Result<BatchStats> {
        let stats = self.for_each(|expanded| {
            serde_json::to_writer(&mut writer, &expanded.into_keyed())?;
            writer.write_all(b"\n")?;
            Ok(())
        })?;
        writer.flush()?;
        Ok(stats)
    }

    /// Write all documents as one JSON object
    pub fn write_json<W: Write>(&self, mut writer: W, pretty: bool) -> Result<BatchStats> {
        let (documents, stats) = self.collect_map()?;
        let documents = Value::Object(documents);

        if pretty {
            let formatter = PrettyFormatter::with_indent(PRETTY_INDENT);
            let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
            documents.serialize(&mut serializer)?;
        } else {
            serde_json::to_writer(&mut writer, &documents)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(stats)
    }

    /// Write in the requested format; `pretty` only affects [`OutputFormat::Json`]
    pub fn write<W: Write>(&self, format: OutputFormat, writer: W, pretty: bool) -> Result<BatchStats> {
        match format {
            OutputFormat::Json => self.write_json(writer, pretty),
            OutputFormat::Ndjson => self.write_ndjson(writer),
        }
    }

    /// Write to `path` through a sibling `.partial` file that replaces the
    /// destination only once every statement has been written. A failed run
    /// leaves an existing file at `path` as it was.
    pub fn write_to_path(&self, format: OutputFormat, path: &Path, pretty: bool) -> Result<BatchStats> {
        let partial = partial_path(path);
        let result = File::create(&partial)
            .map_err(Error::from)
            .and_then(|file| self.write(format, BufWriter::new(file), pretty));

        match result {
            Ok(stats) => {
                fs::rename(&partial, path)?;
                Ok(stats)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    tracing::debug!("Could not remove {}: {}", partial.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    fn notify(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.progress {
            tx.send(msg).ok();
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
