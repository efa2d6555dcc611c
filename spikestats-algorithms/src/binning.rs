//! Count-based binning of spike trains.
//!
//! A neuron's sorted spike times are split into `n_bins` contiguous
//! partitions of near-equal spike count, where
//! `n_bins = floor(total_minutes / bin_width_minutes)`. Partitions share the
//! spikes, not the wall clock: a quiet stretch widens its bin instead of
//! leaving it sparse. Each partition then yields one value per statistic.
//!
//! A partition's observation window opens at the last spike of the previous
//! partition (at time zero for the first one) and closes at its own last
//! spike, so the windows tile the train without gaps.

use crate::statistic::{BinStatistic, SpikeTrain};
use rayon::prelude::*;
use spikestats_core::{ClusterId, NeuronTimeSeries, SpikeTime};
use std::collections::BTreeMap;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bin layout for one estimation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinningConfig {
    /// Nominal bin width in minutes.
    pub bin_width_minutes: f64,
    /// Total analysed time in seconds.
    pub total_time_seconds: f64,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl BinningConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(bin_width_minutes: f64, total_time_seconds: f64) -> Self {
        Self {
            bin_width_minutes,
            total_time_seconds,
        }
    }

    /// Fixed baseline layout: 60 minutes in 2 minute bins.
    #[must_use]
    pub fn baseline() -> Self {
        Self::new(2.0, 3600.0)
    }

    /// Sets the bin width.
    #[must_use]
    pub fn with_bin_width_minutes(mut self, minutes: f64) -> Self {
        self.bin_width_minutes = minutes;
        self
    }

    /// Sets the total time.
    #[must_use]
    pub fn with_total_time_seconds(mut self, seconds: f64) -> Self {
        self.total_time_seconds = seconds;
        self
    }

    /// Number of bins, `floor(total_minutes / bin_width_minutes)`.
    ///
    /// Zero when the width is not positive or the inputs are not finite.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bin_count(&self) -> usize {
        if self.bin_width_minutes.is_nan()
            || self.bin_width_minutes <= 0.0
            || !self.total_time_seconds.is_finite()
        {
            return 0;
        }
        let bins = (self.total_time_seconds / 60.0 / self.bin_width_minutes).floor();
        if bins <= 0.0 {
            0
        } else {
            bins as usize
        }
    }
}

/// Splits `len` items into `n` contiguous ranges of near-equal size.
///
/// The first `len % n` ranges hold one extra item. Ranges are empty when
/// `n > len`. Returns no ranges for `n == 0`.
#[must_use]
pub fn split_even(len: usize, n: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let base = len / n;
    let extra = len % n;
    let mut start = 0;
    (0..n)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// One value per bin for a single neuron; `NaN` marks an undefined bin.
pub type BinnedStat = Vec<f64>;

/// Binned values of one statistic for every neuron.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinnedStatTable {
    /// Statistic label, e.g. `Firing Rate`.
    pub label: String,
    /// Values per neuron, ascending by id.
    pub values: BTreeMap<ClusterId, BinnedStat>,
}

impl BinnedStatTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: BTreeMap::new(),
        }
    }

    /// Bins of one neuron.
    #[must_use]
    pub fn get(&self, cluster: ClusterId) -> Option<&[f64]> {
        self.values.get(&cluster).map(Vec::as_slice)
    }

    /// Number of neurons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the table holds no neurons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(neuron, bins)`.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &[f64])> + '_ {
        self.values.iter().map(|(&c, v)| (c, v.as_slice()))
    }
}

/// Splits spike trains into bins and evaluates a statistic per bin.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinnedStatisticEstimator {
    config: BinningConfig,
}

impl BinnedStatisticEstimator {
    /// Creates an estimator for the given layout.
    #[must_use]
    pub fn new(config: BinningConfig) -> Self {
        Self { config }
    }

    /// Current layout.
    #[must_use]
    pub fn config(&self) -> &BinningConfig {
        &self.config
    }

    /// Number of bins produced per neuron.
    ///
    /// At least one: an empty layout yields a single undefined bin.
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.config.bin_count().max(1)
    }

    /// Estimates one neuron's binned statistic from sorted spike times.
    ///
    /// Degenerate bins become `NaN`; this never fails.
    pub fn estimate<S: BinStatistic + ?Sized>(&self, times: &[SpikeTime], stat: &S) -> BinnedStat {
        let n_bins = self.config.bin_count();
        if n_bins == 0 {
            log::debug!(
                "{}: no bins fit {:.1} s at {} min per bin",
                stat.name(),
                self.config.total_time_seconds,
                self.config.bin_width_minutes
            );
            return vec![f64::NAN];
        }

        let mut window_start = SpikeTime::default();
        split_even(times.len(), n_bins)
            .into_iter()
            .enumerate()
            .map(|(idx, range)| {
                let bin = &times[range];
                let value = match SpikeTrain::with_start(bin, window_start)
                    .and_then(|train| stat.evaluate(&train))
                {
                    Ok(value) => value,
                    Err(reason) => {
                        log::trace!("{} bin {idx} undefined: {reason}", stat.name());
                        f64::NAN
                    }
                };
                if let Some(&last) = bin.last() {
                    window_start = last;
                }
                value
            })
            .collect()
    }

    /// Estimates every neuron of a time series in parallel.
    pub fn estimate_all<S: BinStatistic + ?Sized>(
        &self,
        series: &NeuronTimeSeries,
        stat: &S,
    ) -> BinnedStatTable {
        let clusters: Vec<ClusterId> = series.clusters().collect();
        let values = clusters
            .par_iter()
            .map(|&cluster| (cluster, self.estimate(&series.times(cluster), stat)))
            .collect();

        BinnedStatTable {
            label: stat.name().to_string(),
            values,
        }
    }
}
