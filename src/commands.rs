use crate::InputArgs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use vrs_inline::config::{self, InlineConfig};
use vrs_inline::input::{self, InputSet};
use vrs_inline::storage::{LoadStats, RecordStore};
use vrs_inline::ui::{self, Icons, ProgressManager};
use vrs_inline::{BatchDriver, BatchOptions, ErrorPolicy, Expander, Namespace, OutputFormat, RecordId};

/// `inline` flags that can also come from the `[output]` config table
pub struct InlineArgs {
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub compact: bool,
    pub skip_errors: bool,
    pub jobs: Option<usize>,
}

fn resolve_inputs(args: &InputArgs) -> anyhow::Result<(InlineConfig, InputSet)> {
    let config = config::load_config(args.config.as_deref())?.unwrap_or_default();
    let inputs = config.inputs.merged_with(&args.to_config()).resolve()?;
    Ok((config, inputs))
}

fn open_store(inputs: &InputSet) -> anyhow::Result<(RecordStore, Vec<LoadStats>)> {
    let store = RecordStore::open_in_memory()?;
    let stats = input::load_inputs(&store, inputs)?;
    Ok((store, stats))
}

pub fn run_inline(args: &InputArgs, inline: InlineArgs, quiet: bool) -> anyhow::Result<()> {
    let (config, inputs) = resolve_inputs(args)?;
    let output_cfg = config.output;

    let format = inline.format.or(output_cfg.format).unwrap_or_default();
    let output = inline.output.or_else(|| output_cfg.path.map(PathBuf::from));
    let compact = inline.compact || output_cfg.compact.unwrap_or(false);
    let skip_errors = inline.skip_errors || output_cfg.skip_errors.unwrap_or(false);
    let jobs = inline.jobs.or(output_cfg.jobs).unwrap_or(1);
    if jobs == 0 {
        anyhow::bail!("--jobs must be at least 1");
    }

    let start = Instant::now();
    if !quiet {
        ui::header("Inlining statements");
        ui::status(Icons::FOLDER, "Statements", &inputs.statements.display().to_string());
        ui::status(Icons::FILE, "Format", format.as_str());
    }

    let (store, loads) = open_store(&inputs)?;
    if !quiet {
        for load in &loads {
            ui::status(Icons::DATABASE, "Loaded", &load.to_string());
        }
    }

    let options = BatchOptions {
        on_error: if skip_errors { ErrorPolicy::Skip } else { ErrorPolicy::Abort },
        jobs,
    };
    let (progress, tx) = ProgressManager::new(quiet);
    let driver = BatchDriver::new(&store, options).with_progress(tx);

    let result = match &output {
        Some(path) => driver.write_to_path(format, path, !compact),
        None => driver.write(format, BufWriter::new(io::stdout().lock()), !compact),
    };
    // closes the progress channel
    drop(driver);

    match result {
        Ok(stats) => {
            if quiet {
                progress.join();
            } else {
                progress.finish_with_summary(start.elapsed(), stats.expanded, stats.skipped);
                eprint!("{}", stats);
                if stats.skipped > 0 {
                    ui::warn(&format!("{} statements left out of the output", stats.skipped));
                }
                let destination = output
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "stdout".to_string());
                ui::status(Icons::DATABASE, "Written to", &destination);
            }
            Ok(())
        }
        Err(e) => {
            progress.join();
            Err(e.into())
        }
    }
}

pub fn run_show(statement: &str, args: &InputArgs) -> anyhow::Result<()> {
    let (_, inputs) = resolve_inputs(args)?;
    let (store, _) = open_store(&inputs)?;

    let record_id = if statement.contains(".json#/") {
        let id = RecordId::parse(statement)?;
        if id.namespace != Namespace::Stmts {
            anyhow::bail!("{} is not a statement identifier", statement);
        }
        id
    } else {
        RecordId::new(Namespace::Stmts, statement)
    };

    let expanded = Expander::new(&store).expand_id(&record_id.to_id_string())?;
    println!("{}", serde_json::to_string_pretty(&expanded.into_keyed())?);
    Ok(())
}

pub fn run_stats(args: &InputArgs, json: bool) -> anyhow::Result<()> {
    let (_, inputs) = resolve_inputs(args)?;
    let (store, loads) = open_store(&inputs)?;
    let stats = store.stats()?;

    if json {
        let data = serde_json::json!({
            "records": stats,
            "duplicates": loads
                .iter()
                .map(|l| (l.namespace.as_str().to_string(), serde_json::Value::from(l.duplicates)))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    let mut rows: Vec<(&str, String)> = Vec::new();
    for load in &loads {
        let value = if load.duplicates > 0 {
            format!("{} ({} duplicates ignored)", load.inserted, load.duplicates)
        } else {
            load.inserted.to_string()
        };
        rows.push((load.namespace.label(), value));
    }
    rows.push(("Total", stats.total().to_string()));

    ui::section(&format!("{} Record Store", Icons::STATS));
    println!("{}", ui::stats_table(&rows));
    Ok(())
}

pub fn run_init(path: &Path, force: bool, quiet: bool) -> anyhow::Result<()> {
    config::write_config(path, &config::template_config(), force)?;
    if !quiet {
        ui::success(&format!("Wrote {}", path.display()));
    }
    Ok(())
}
