mod compare;
mod compare_cmd;
mod config;
mod inspect;
mod loader;
mod record;
mod report;
mod snapshot;

use clap::{Parser, Subcommand};
use config::{CliOverrides, ReportConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Inspect and compare agent benchmark evaluation logs (one JSON record
/// per line): digest a single run, or diff a baseline run against an
/// optimized one and write a comparison report.
#[derive(Parser, Debug)]
#[command(name = "evalreport", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "evalreport.toml", global = true)]
    config: PathBuf,

    /// Extra logging (per-file load summaries, comparison figures)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only errors; skipped-line warnings are suppressed
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a baseline run against an optimized run
    #[command(after_help = "Example:\n  evalreport compare \\\n      --baseline 'evaluation/evaluation_outputs/baseline_*/output.jsonl' \\\n      --optimized 'evaluation/evaluation_outputs/optimized_*/output.jsonl'")]
    Compare {
        /// Baseline evaluation output (output.jsonl, .jsonl.zst, or a glob pattern)
        #[arg(long)]
        baseline: PathBuf,

        /// Optimized evaluation output (output.jsonl, .jsonl.zst, or a glob pattern)
        #[arg(long)]
        optimized: PathBuf,

        /// Report destination (default: comparison_report.txt)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print a digest of the first record of an evaluation output
    Inspect {
        /// Evaluation output to read (default: from config)
        log: Option<PathBuf>,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        match &self.command {
            Commands::Compare { output, .. } => CliOverrides {
                output: output.clone(),
                ..Default::default()
            },
            Commands::Inspect { log } => CliOverrides {
                inspect_log: log.clone(),
                ..Default::default()
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Log level: --quiet = error only, --verbose = debug+, default = info+
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_env_filter(filter)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let mut config = match ReportConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&cli.overrides());

    let result = match &cli.command {
        Commands::Compare {
            baseline,
            optimized,
            ..
        } => compare_cmd::handle_compare(baseline, optimized, &config.compare),
        Commands::Inspect { .. } => inspect::handle_inspect(&config.inspect.log, &config.inspect),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
