use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use super::logging::LogDestination;

/// Resumable batch enrichment of software descriptions through an LLM.
#[derive(Debug, Parser)]
#[command(name = "batch-enrich", version)]
#[command(about = "Enrich a CSV of software descriptions, resumably", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start or resume a batch over a work-source CSV
    Run {
        /// CSV with a name column and a description column
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Re-run only the items in the last failure export
    ///
    /// By default the retry shares the main run's progress file, so its
    /// completed set keeps growing across both passes. Pass a fresh
    /// `--progress-file` to keep a separate record that holds only the
    /// retried items.
    Retry {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Run { common, .. } | Commands::Retry { common } => common,
        }
    }
}

/// How to answer "resume previous progress?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResumeMode {
    /// Ask on the terminal
    Ask,
    /// Always resume
    Yes,
    /// Always start fresh
    No,
}

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Progress record, rewritten after every item
    #[arg(long, default_value = "enrichment_progress.json")]
    pub progress_file: PathBuf,

    /// Failure export written at the end of every run; input of `retry`
    #[arg(long, default_value = "enrichment_failed.csv")]
    pub failed_file: PathBuf,

    /// Directory receiving one JSON document per enriched item
    #[arg(long, default_value = "enriched")]
    pub output_dir: PathBuf,

    /// Resume behaviour when a progress record exists [default: ask on a terminal, else yes]
    #[arg(long, value_enum)]
    pub resume: Option<ResumeMode>,

    /// Seconds between enrichment calls
    #[arg(long, default_value = "1", value_parser = parse_seconds)]
    pub delay_secs: Duration,

    /// Seconds of extra pause at each checkpoint
    #[arg(long, default_value = "5", value_parser = parse_seconds)]
    pub cooldown_secs: Duration,

    /// Items between checkpoints (0 disables the pause)
    #[arg(long, default_value_t = 5)]
    pub cooldown_every: usize,

    /// Model name [env: ANTHROPIC_MODEL]
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum tokens per enrichment answer
    #[arg(long, default_value_t = 4000)]
    pub max_tokens: u32,

    /// Upper bound in seconds on one enrichment or save call
    #[arg(long, default_value = "180", value_parser = parse_seconds)]
    pub call_timeout_secs: Duration,

    /// Header of the item name column
    #[arg(long, default_value = "software_name")]
    pub name_column: String,

    /// Header of the description column
    #[arg(long, default_value = "description")]
    pub payload_column: String,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    pub log: LogDestination,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{raw}` is not a valid duration"))
}
