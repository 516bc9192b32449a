//! `reconcsv` — reconcile delimited files across two folders by composite key.

mod exit_codes;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use reconcsv_io::ResultWriter;
use reconcsv_recon::{MatchRule, PairMode, ReconError, ReconciliationConfig};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "reconcsv")]
#[command(version)]
#[command(about = "Reconcile delimited files across two folders by composite key")]
#[command(after_help = "\
Examples:
  reconcsv data/FolderA data/FolderB --rules match-rules.json
  reconcsv A B -r rules.json -o results -d ';' --jobs 4
  reconcsv A B -r rules.json --mode all-files --no-header")]
struct Args {
    /// Folder containing side A files
    folder_a: PathBuf,

    /// Folder containing side B files
    folder_b: PathBuf,

    /// Match-rule JSON document (matchingFields, caseSensitive, trim)
    #[arg(long, short = 'r')]
    rules: PathBuf,

    /// Output folder for result artifacts and the run log
    #[arg(long, short = 'o', default_value = "output")]
    output: PathBuf,

    /// Field delimiter
    #[arg(long, short = 'd', default_value = ",")]
    delimiter: char,

    /// Input files have no header row (columns become Column1..N)
    #[arg(long)]
    no_header: bool,

    /// How files are paired across the folders
    #[arg(long, value_enum, default_value = "single-file")]
    mode: Mode,

    /// Max file pairs reconciled concurrently (0 = logical CPU count)
    #[arg(long, short = 'j', default_value_t = 0)]
    jobs: usize,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Pair files sharing the same name in both folders
    SingleFile,
    /// Compare every file in A against every file in B
    AllFiles,
}

impl From<Mode> for PairMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::SingleFile => PairMode::SingleFile,
            Mode::AllFiles => PairMode::AllFiles,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run(args: Args) -> Result<(), ReconError> {
    std::fs::create_dir_all(&args.output)
        .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", args.output.display())))?;
    init_logging(&args.output, args.verbose)?;

    let rule_text = std::fs::read_to_string(&args.rules)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", args.rules.display())))?;
    let match_rule = MatchRule::from_json(&rule_text)?;

    let config = ReconciliationConfig {
        folder_a: args.folder_a,
        folder_b: args.folder_b,
        output_folder: args.output.clone(),
        match_rule,
        parallelism: args.jobs,
        delimiter: args.delimiter,
        has_header_row: !args.no_header,
        pair_mode: args.mode.into(),
    };
    config.validate()?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received: finishing in-flight pairs, dispatching no new ones");
            signal_cancel.cancel();
        }
    });

    let writer = Arc::new(ResultWriter::new(&args.output, args.delimiter));
    let summary = reconcsv_recon::run(Arc::new(config), writer, cancel.clone()).await?;

    if cancel.is_cancelled() {
        warn!("run was cancelled; results cover completed pairs only");
    }

    eprintln!(
        "{} pair(s): {} matched, {} only in A, {} only in B, {} errors ({} ms)",
        summary.total_file_pairs,
        summary.total_matched,
        summary.total_only_in_a,
        summary.total_only_in_b,
        summary.total_errors,
        summary.total_processing_time_ms,
    );

    Ok(())
}

/// Stderr plus a per-run log file inside the output folder.
fn init_logging(output_folder: &Path, verbose: bool) -> Result<(), ReconError> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let log_path = output_folder.join(format!(
        "reconciliation-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    let log_file = File::create(&log_path)
        .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", log_path.display())))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();

    Ok(())
}

fn exit_code_for(error: &ReconError) -> u8 {
    match error {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_USAGE,
        ReconError::MissingFolder(_) | ReconError::Io(_) => EXIT_ERROR,
    }
}
