//! spikestats-algorithms: Binned spike statistics and the recording pipeline.
//!
//! This crate provides:
//! - **Binning** - count-based partitions of each neuron's spike train
//! - **Statistics** - mean firing rate and CV-ISI per bin
//! - **Summaries** - per-neuron medians joined into recording tables
//! - **Processing** - the batch pipeline over many recordings
//!
#![warn(missing_docs)]

mod binning;
mod processing;
mod statistic;
mod summary;

pub use binning::{
    split_even, BinnedStat, BinnedStatTable, BinnedStatisticEstimator, BinningConfig,
};
pub use processing::{
    BatchOutcome, DiscardPlots, FailurePolicy, PipelineConfig, PlotSink, RecordingFailure,
    RecordingSource, RecordingStatsPipeline, RecordingTraces, SummarySink,
};
pub use statistic::{BinStatistic, CvIsi, MeanFiringRate, SpikeTrain, FIRING_RATE_SCALE};
pub use summary::{
    median, medians, CombinedRow, CombinedSummary, MedianPolicy, RecordingSummary, SummaryRow,
};

// Re-export core types used throughout the public API
pub use spikestats_core::{ClusterId, ExperimentKind, SpikeTime};
