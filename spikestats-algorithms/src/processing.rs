//! Recording pipeline: normalize, segment, bin, summarize.
//!
//! Loading recordings and consuming the results are left to collaborators
//! behind the [`RecordingSource`], [`PlotSink`] and [`SummarySink`] traits.
#![allow(clippy::cast_precision_loss)]

use crate::binning::{BinnedStatTable, BinnedStatisticEstimator, BinningConfig};
use crate::statistic::{CvIsi, MeanFiringRate, FIRING_RATE_SCALE};
use crate::summary::{medians, CombinedSummary, MedianPolicy, RecordingSummary};
use spikestats_core::{
    segment_conditions, BoxError, ClusterId, ConditionSegmentation, Error, ExperimentKind,
    NeuronTimeSeries, NormalizedEventTable, RawEventTable, Result, BASELINE, NANOS_PER_SEC,
};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a batch run does when one recording fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum FailurePolicy {
    /// Stop at the first failure and return its error. Nothing is persisted.
    #[default]
    AbortBatch,
    /// Log the failure, leave the recording out and keep going.
    SkipRecording,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// Protocol used to find condition boundaries.
    pub experiment: ExperimentKind,
    /// Layout of the baseline pass (60 min in 2 min bins unless overridden).
    pub baseline: BinningConfig,
    /// Bin width of the full-session pass; its length comes from the segmenter.
    pub session_bin_width_minutes: f64,
    /// Handling of undefined bins in medians.
    pub median_policy: MedianPolicy,
    /// Handling of failing recordings.
    pub failure_policy: FailurePolicy,
    /// Output multiplier for firing rates.
    pub firing_rate_scale: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(ExperimentKind::Dreadd)
    }
}

impl PipelineConfig {
    /// Default configuration for an experiment protocol.
    #[must_use]
    pub fn new(experiment: ExperimentKind) -> Self {
        Self {
            experiment,
            baseline: BinningConfig::baseline(),
            session_bin_width_minutes: 2.0,
            median_policy: MedianPolicy::default(),
            failure_policy: FailurePolicy::default(),
            firing_rate_scale: FIRING_RATE_SCALE,
        }
    }

    /// Sets the baseline layout.
    #[must_use]
    pub fn with_baseline(mut self, baseline: BinningConfig) -> Self {
        self.baseline = baseline;
        self
    }

    /// Sets the full-session bin width.
    #[must_use]
    pub fn with_session_bin_width_minutes(mut self, minutes: f64) -> Self {
        self.session_bin_width_minutes = minutes;
        self
    }

    /// Sets the median policy.
    #[must_use]
    pub fn with_median_policy(mut self, policy: MedianPolicy) -> Self {
        self.median_policy = policy;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Sets the firing rate multiplier.
    #[must_use]
    pub fn with_firing_rate_scale(mut self, scale: f64) -> Self {
        self.firing_rate_scale = scale;
        self
    }

    /// Checks the bin widths and scale.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for non-positive or non-finite values.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("baseline bin width", self.baseline.bin_width_minutes),
            ("baseline total time", self.baseline.total_time_seconds),
            ("session bin width", self.session_bin_width_minutes),
            ("firing rate scale", self.firing_rate_scale),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Supplies raw event tables by recording name.
pub trait RecordingSource {
    /// Loads one recording.
    ///
    /// # Errors
    /// Any loader failure; the pipeline wraps it in [`Error::Load`].
    fn load(&self, recording: &str) -> std::result::Result<RawEventTable, BoxError>;
}

impl RecordingSource for HashMap<String, RawEventTable> {
    fn load(&self, recording: &str) -> std::result::Result<RawEventTable, BoxError> {
        self.get(recording)
            .cloned()
            .ok_or_else(|| format!("no table registered for `{recording}`").into())
    }
}

impl RecordingSource for BTreeMap<String, RawEventTable> {
    fn load(&self, recording: &str) -> std::result::Result<RawEventTable, BoxError> {
        self.get(recording)
            .cloned()
            .ok_or_else(|| format!("no table registered for `{recording}`").into())
    }
}

/// Consumes per-recording plot data.
pub trait PlotSink {
    /// Receives the traces of one recording.
    ///
    /// # Errors
    /// Any sink failure; the pipeline wraps it in [`Error::Sink`].
    fn render(&mut self, traces: &RecordingTraces) -> std::result::Result<(), BoxError>;
}

impl PlotSink for Vec<RecordingTraces> {
    fn render(&mut self, traces: &RecordingTraces) -> std::result::Result<(), BoxError> {
        self.push(traces.clone());
        Ok(())
    }
}

/// Plot sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardPlots;

impl PlotSink for DiscardPlots {
    fn render(&mut self, _traces: &RecordingTraces) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

/// Persists the combined summary once per batch.
pub trait SummarySink {
    /// Writes the summary.
    ///
    /// # Errors
    /// Any sink failure; the pipeline wraps it in [`Error::Sink`].
    fn persist(&mut self, summary: &CombinedSummary) -> std::result::Result<(), BoxError>;
}

impl SummarySink for Option<CombinedSummary> {
    fn persist(&mut self, summary: &CombinedSummary) -> std::result::Result<(), BoxError> {
        *self = Some(summary.clone());
        Ok(())
    }
}

/// Everything the plotting collaborator needs for one recording.
///
/// No statistics are left to compute on the receiving side.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordingTraces {
    /// Recording name.
    pub recording: String,
    /// Protocol.
    pub experiment: ExperimentKind,
    /// Condition windows and phase count.
    pub segmentation: ConditionSegmentation,
    /// Full-session length in seconds.
    pub session_end_secs: f64,
    /// Bin width of the full-session traces.
    pub bin_width_minutes: f64,
    /// Full-session firing rate bins, all neurons.
    pub firing_rate: BinnedStatTable,
    /// Full-session CV-ISI bins, all neurons.
    pub cv_isi: BinnedStatTable,
    /// Baseline medians.
    pub baseline: RecordingSummary,
    /// Baseline inter-spike intervals in seconds, per neuron.
    pub baseline_isis: BTreeMap<ClusterId, Vec<f64>>,
}

impl RecordingTraces {
    /// Session length in whole minutes (the trace x-axis extent).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn session_minutes(&self) -> u64 {
        (self.session_end_secs / 60.0).floor().max(0.0) as u64
    }
}

/// A recording left out of the summary.
#[derive(Debug)]
pub struct RecordingFailure {
    /// Recording name.
    pub recording: String,
    /// Cause.
    pub error: Error,
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Combined baseline summary, as persisted.
    pub summary: CombinedSummary,
    /// Recordings skipped under [`FailurePolicy::SkipRecording`].
    pub failures: Vec<RecordingFailure>,
}

/// Runs the statistics engine over a list of recordings.
#[derive(Debug, Clone, Default)]
pub struct RecordingStatsPipeline {
    config: PipelineConfig,
}

impl RecordingStatsPipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Computes the baseline summary and full-session traces of one recording.
    ///
    /// # Errors
    /// [`Error::Schema`] or [`Error::DataIntegrity`] from normalization,
    /// [`Error::MissingCondition`] from segmentation.
    pub fn process_recording(
        &self,
        recording: &str,
        raw: &RawEventTable,
    ) -> Result<(RecordingSummary, RecordingTraces)> {
        let table = NormalizedEventTable::from_raw(raw)?;
        let segmentation = segment_conditions(&table, self.config.experiment)?;
        let rate = MeanFiringRate::with_scale(self.config.firing_rate_scale);
        let policy = self.config.median_policy;

        // Baseline always uses its fixed layout, whatever the segmenter found.
        let baseline_series = NeuronTimeSeries::pivot(&table.filter_condition(BASELINE));
        let baseline_est = BinnedStatisticEstimator::new(self.config.baseline);
        let baseline_rates = baseline_est.estimate_all(&baseline_series, &rate);
        let baseline_cvs = baseline_est.estimate_all(&baseline_series, &CvIsi);
        let summary = RecordingSummary::join(
            recording,
            &medians(&baseline_cvs, policy),
            &medians(&baseline_rates, policy),
        );
        log::info!(
            "{recording}: {} baseline neuron(s) over {} bins",
            summary.len(),
            baseline_est.output_len()
        );

        let session_end_secs = segmentation.session_end().as_secs_f64();
        let session_series = NeuronTimeSeries::pivot(&table);
        let session_est = BinnedStatisticEstimator::new(BinningConfig::new(
            self.config.session_bin_width_minutes,
            session_end_secs,
        ));
        let firing_rate = session_est.estimate_all(&session_series, &rate);
        let cv_isi = session_est.estimate_all(&session_series, &CvIsi);
        log::debug!(
            "{recording}: {} neuron(s), {} session bins ending at {session_end_secs:.1} s",
            session_series.len(),
            session_est.output_len()
        );

        let traces = RecordingTraces {
            recording: recording.to_string(),
            experiment: self.config.experiment,
            segmentation,
            session_end_secs,
            bin_width_minutes: self.config.session_bin_width_minutes,
            firing_rate,
            cv_isi,
            baseline: summary.clone(),
            baseline_isis: baseline_isis(&baseline_series),
        };

        Ok((summary, traces))
    }

    /// Processes every recording in order and persists the combined summary.
    ///
    /// # Errors
    /// Under [`FailurePolicy::AbortBatch`], the first recording error. Under
    /// either policy, a failure of the summary sink.
    pub fn run<S, P, W>(
        &self,
        recordings: &[String],
        source: &S,
        plots: &mut P,
        sink: &mut W,
    ) -> Result<BatchOutcome>
    where
        S: RecordingSource + ?Sized,
        P: PlotSink + ?Sized,
        W: SummarySink + ?Sized,
    {
        self.config.validate()?;

        let mut outcome = BatchOutcome::default();
        for recording in recordings {
            log::info!("Loading data: {recording}");
            match self.run_one(recording, source, plots) {
                Ok(summary) => outcome.summary.append(&summary),
                Err(error) => match self.config.failure_policy {
                    FailurePolicy::AbortBatch => return Err(error),
                    FailurePolicy::SkipRecording => {
                        log::warn!("skipping recording {recording}: {error}");
                        outcome.failures.push(RecordingFailure {
                            recording: recording.clone(),
                            error,
                        });
                    }
                },
            }
        }

        sink.persist(&outcome.summary)
            .map_err(|source| Error::Sink { source })?;
        log::info!(
            "summarized {} neuron(s) from {} recording(s), {} skipped",
            outcome.summary.len(),
            recordings.len() - outcome.failures.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }

    fn run_one<S, P>(&self, recording: &str, source: &S, plots: &mut P) -> Result<RecordingSummary>
    where
        S: RecordingSource + ?Sized,
        P: PlotSink + ?Sized,
    {
        let raw = source.load(recording).map_err(|source| Error::Load {
            recording: recording.to_string(),
            source,
        })?;
        let (summary, traces) = self.process_recording(recording, &raw)?;
        plots
            .render(&traces)
            .map_err(|source| Error::Sink { source })?;
        Ok(summary)
    }
}

fn baseline_isis(series: &NeuronTimeSeries) -> BTreeMap<ClusterId, Vec<f64>> {
    series
        .iter()
        .map(|(cluster, entries)| {
            let isis = entries
                .windows(2)
                .map(|w| w[1].time.saturating_since(w[0].time) as f64 / NANOS_PER_SEC as f64)
                .collect();
            (cluster, isis)
        })
        .collect()
}
