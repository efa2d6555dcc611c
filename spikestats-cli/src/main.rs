//! spikestats command-line interface.
//!
//! Runs the baseline statistics batch over a set of recordings and inspects
//! single recording files.
#![allow(clippy::uninlined_format_args)]

mod options;

use clap::{Args, Parser, Subcommand, ValueEnum};
use options::AnalysisOptions;
use spikestats_algorithms::{
    DiscardPlots, FailurePolicy, MedianPolicy, PlotSink, RecordingStatsPipeline,
};
use spikestats_core::{
    segment_conditions, ExperimentKind, NeuronTimeSeries, NormalizedEventTable, SpikeTime,
};
use spikestats_io::{read_event_csv, PlotStyle, RecordingDirectory, SummaryCsvWriter, TraceWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    SpikestatsIo(#[from] spikestats_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] spikestats_core::Error),
}

/// Experiment protocol selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Experiment {
    /// Single CNO challenge
    Dreadd,
    /// Citalopram, optionally followed by WAY
    Cit,
}

impl From<Experiment> for ExperimentKind {
    fn from(value: Experiment) -> Self {
        match value {
            Experiment::Dreadd => ExperimentKind::Dreadd,
            Experiment::Cit => ExperimentKind::Cit,
        }
    }
}

/// Median handling selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Median {
    /// Ignore undefined bins
    Skip,
    /// Undefined bins make the median undefined
    Propagate,
}

/// Per-neuron spike statistics for electrophysiology recordings.
#[derive(Parser)]
#[command(name = "spikestats")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute baseline summaries and session traces for a batch of recordings
    Run(RunArgs),

    /// Show events, neurons and condition windows of one recording file
    Inspect {
        /// Recording CSV file
        input: PathBuf,

        /// Experiment protocol
        #[arg(short, long, value_enum, default_value = "dreadd")]
        experiment: Experiment,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON options file
    #[arg(short, long)]
    options: Option<PathBuf>,

    /// Recording to analyse (repeatable; replaces the file's list)
    #[arg(short, long = "recording")]
    recordings: Vec<String>,

    /// Folder holding one sub-folder per recording
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Experiment protocol
    #[arg(short, long, value_enum)]
    experiment: Option<Experiment>,

    /// Destination of per-neuron plot documents
    #[arg(long)]
    fig_folder: Option<PathBuf>,

    /// Destination of spike_stats.csv
    #[arg(long)]
    temp_folder: Option<PathBuf>,

    /// Median handling for undefined bins
    #[arg(long, value_enum)]
    median: Option<Median>,

    /// Skip failing recordings instead of aborting the batch
    #[arg(long)]
    skip_failed: bool,

    /// Do not write plot documents
    #[arg(long)]
    no_plots: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Loads the options file, if any, and applies command-line overrides.
fn resolve_options(args: &RunArgs) -> Result<AnalysisOptions> {
    let mut ops = match &args.options {
        Some(path) => AnalysisOptions::from_json_file(path)?,
        None => AnalysisOptions::default(),
    };

    if !args.recordings.is_empty() {
        ops.recordings_to_analyse.clone_from(&args.recordings);
    }
    if let Some(dir) = &args.data_dir {
        ops.data_dir.clone_from(dir);
    }
    if let Some(experiment) = args.experiment {
        ops.experiment = experiment.into();
    }
    if let Some(dir) = &args.fig_folder {
        ops.fig_folder.clone_from(dir);
    }
    if let Some(dir) = &args.temp_folder {
        ops.temp_folder.clone_from(dir);
    }
    if let Some(median) = args.median {
        ops.median_policy = match median {
            Median::Skip => MedianPolicy::SkipUndefined,
            Median::Propagate => MedianPolicy::Propagate,
        };
    }
    if args.skip_failed {
        ops.failure_policy = FailurePolicy::SkipRecording;
    }
    ops.verbose |= args.verbose;

    ops.validate()?;
    Ok(ops)
}

/// Installs the logger; `RUST_LOG` takes precedence over `verbose`.
///
/// Returns `false` when a logger was already installed, which is kept.
fn init_logging(verbose: bool) -> bool {
    let level = if verbose { "info" } else { "warn" };
    let builder_result =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .try_init();
    match builder_result {
        Ok(()) => true,
        Err(err) => {
            log::debug!("keeping existing logger: {}", err);
            false
        }
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let ops = resolve_options(args)?;
    init_logging(ops.verbose);

    let pipeline = RecordingStatsPipeline::new(ops.pipeline_config());
    let source = RecordingDirectory::new(&ops.data_dir);
    let mut sink = SummaryCsvWriter::new(&ops.temp_folder);
    let mut traces = TraceWriter::new(&ops.fig_folder, PlotStyle::default());
    let mut discard = DiscardPlots;
    let plots: &mut dyn PlotSink = if args.no_plots {
        &mut discard
    } else {
        &mut traces
    };

    log::info!(
        "{} recording(s) from {}, experiment {}",
        ops.recordings_to_analyse.len(),
        ops.data_dir.display(),
        ops.experiment
    );
    let start = Instant::now();
    let outcome = pipeline.run(&ops.recordings_to_analyse, &source, plots, &mut sink)?;
    let elapsed = start.elapsed();

    println!(
        "Processed {} recording(s) in {:.2}s",
        ops.recordings_to_analyse.len() - outcome.failures.len(),
        elapsed.as_secs_f64()
    );
    println!("Neurons summarized: {}", outcome.summary.len());
    println!("Summary: {}", sink.path().display());
    for failure in &outcome.failures {
        println!("Skipped {}: {}", failure.recording, failure.error);
    }
    Ok(())
}

fn inspect(input: &Path, experiment: ExperimentKind) -> Result<()> {
    init_logging(false);
    let raw = read_event_csv(input)?;
    let table = NormalizedEventTable::from_raw(&raw)?;
    let series = NeuronTimeSeries::pivot(&table);

    println!("File: {}", input.display());
    println!("Events: {}", table.len());
    println!("Neurons: {}", series.len());
    for condition in table.conditions() {
        let last = table.last_time(condition).map_or(0.0, |t| SpikeTime::as_secs_f64(&t));
        println!("  {:<10} last spike at {:.3}s", condition, last);
    }

    match segment_conditions(&table, experiment) {
        Ok(segmentation) => {
            println!("Conditions ({}): {}", experiment, segmentation.n_conditions);
            println!(
                "Session end: {:.3}s",
                segmentation.session_end().as_secs_f64()
            );
        }
        Err(err) => println!("Segmentation ({}): {}", experiment, err),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(&args)?,
        Commands::Inspect { input, experiment } => inspect(&input, experiment.into())?,
    }

    Ok(())
}
