//! vrs-inline CLI - resolve VRS statement references into self-contained documents

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vrs_inline::config::InputsConfig;
use vrs_inline::OutputFormat;

#[derive(Parser)]
#[command(name = "vrs-inline")]
#[command(version)]
#[command(about = "Inline cross-referenced VRS records into one JSON document per statement")]
#[command(long_about = r#"
vrs-inline loads four JSON collections - statements, categorical variants,
contextual variants and sequence references - and writes every statement with
its references resolved in place.

Example usage:
  vrs-inline inline --input-dir ./data --output gk-pilot.json
  vrs-inline inline --input-dir ./data --format ndjson > gk-pilot.ndjson
  vrs-inline show SCV000927861.1 --input-dir ./data
  vrs-inline stats --input-dir ./data
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print documents and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the four input collections come from
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Path to the config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding stmts.json, catvars.json, ctxvars.json and seqrefs.json
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Statements file
    #[arg(long)]
    pub statements: Option<PathBuf>,

    /// Categorical variants file
    #[arg(long)]
    pub categorical: Option<PathBuf>,

    /// Contextual variants file
    #[arg(long)]
    pub contextual: Option<PathBuf>,

    /// Sequence references file
    #[arg(long)]
    pub sequences: Option<PathBuf>,
}

impl InputArgs {
    pub fn to_config(&self) -> InputsConfig {
        let as_string = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().to_string());
        InputsConfig {
            dir: as_string(&self.input_dir),
            statements: as_string(&self.statements),
            categorical: as_string(&self.categorical),
            contextual: as_string(&self.contextual),
            sequences: as_string(&self.sequences),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Expand every statement and write the documents
    Inline {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout); replaced only when the run succeeds
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write unified JSON on a single line
        #[arg(long)]
        compact: bool,

        /// Leave out statements that fail to expand instead of stopping
        #[arg(long)]
        skip_errors: bool,

        /// Number of expansion threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Expand a single statement and print it
    Show {
        /// Statement key (e.g. SCV000927861.1) or full identifier
        statement: String,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Show record counts for the input collections
    Stats {
        #[command(flatten)]
        inputs: InputArgs,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a template config file
    Init {
        /// Where to write the config
        #[arg(short, long, default_value = "vrs-inline.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries documents, so logs go to stderr
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let quiet = cli.quiet;
    match cli.command {
        Commands::Inline { inputs, format, output, compact, skip_errors, jobs } => {
            commands::run_inline(
                &inputs,
                commands::InlineArgs { format, output, compact, skip_errors, jobs },
                quiet,
            )
        }
        Commands::Show { statement, inputs } => commands::run_show(&statement, &inputs),
        Commands::Stats { inputs, json } => commands::run_stats(&inputs, json),
        Commands::Init { path, force } => commands::run_init(&path, force, quiet),
    }
}
