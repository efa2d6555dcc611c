//! Per-bin spike statistics.
//!
//! A bin of spike times is turned into a [`SpikeTrain`] (a point process
//! running from its first to its last spike) and reduced to a scalar by a
//! [`BinStatistic`]. Statistics report [`DegenerateBinError`] when a bin
//! cannot support them; the estimator maps those to `NaN`.
#![allow(clippy::cast_precision_loss)]

use spikestats_core::{DegenerateBinError, SpikeTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Multiplier applied to spikes-per-nanosecond firing rates.
///
/// Rates are computed against the nanosecond time base and scaled by this
/// constant, so a neuron firing at 1 Hz reports `10.0`.
pub const FIRING_RATE_SCALE: f64 = 1e10;

/// A point process built from one bin of spike times.
#[derive(Debug, Clone, Copy)]
pub struct SpikeTrain<'a> {
    times: &'a [SpikeTime],
    t_start: SpikeTime,
    t_stop: SpikeTime,
}

impl<'a> SpikeTrain<'a> {
    /// Wraps sorted spike times observed from the first spike to the last.
    ///
    /// # Errors
    /// Returns [`DegenerateBinError::Empty`] when there are no spikes to take
    /// a stop time from.
    pub fn new(times: &'a [SpikeTime]) -> Result<Self, DegenerateBinError> {
        let first = times.first().copied().ok_or(DegenerateBinError::Empty)?;
        Self::with_start(times, first)
    }

    /// Wraps sorted spike times observed from `t_start` to the last spike.
    ///
    /// A start later than the first spike is clamped to it.
    ///
    /// # Errors
    /// Returns [`DegenerateBinError::Empty`] when there are no spikes to take
    /// a stop time from.
    pub fn with_start(
        times: &'a [SpikeTime],
        t_start: SpikeTime,
    ) -> Result<Self, DegenerateBinError> {
        match (times.first(), times.last()) {
            (Some(&first), Some(&t_stop)) => Ok(Self {
                times,
                t_start: t_start.min(first),
                t_stop,
            }),
            _ => Err(DegenerateBinError::Empty),
        }
    }

    /// Spike times.
    #[must_use]
    pub fn times(&self) -> &'a [SpikeTime] {
        self.times
    }

    /// Number of spikes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True when the train holds no spikes (never true for a constructed train).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Start of the observation window.
    #[must_use]
    pub fn t_start(&self) -> SpikeTime {
        self.t_start
    }

    /// Last spike.
    #[must_use]
    pub fn t_stop(&self) -> SpikeTime {
        self.t_stop
    }

    /// Observation window length in nanoseconds.
    #[must_use]
    pub fn duration_nanos(&self) -> u64 {
        self.t_stop.saturating_since(self.t_start)
    }

    /// Inter-spike intervals in nanoseconds.
    pub fn intervals(&self) -> impl Iterator<Item = u64> + 'a {
        self.times.windows(2).map(|w| w[1].saturating_since(w[0]))
    }
}

/// A scalar statistic of one bin.
pub trait BinStatistic: Send + Sync {
    /// Label used for the summary column.
    fn name(&self) -> &'static str;

    /// Evaluates the statistic.
    ///
    /// # Errors
    /// Returns [`DegenerateBinError`] when the train is too small.
    fn evaluate(&self, train: &SpikeTrain<'_>) -> Result<f64, DegenerateBinError>;
}

/// Mean firing rate over the train's observation window.
///
/// Spikes in the train divided by `t_stop - t_start`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeanFiringRate {
    /// Multiplier on the spikes-per-nanosecond rate.
    pub scale: f64,
}

impl Default for MeanFiringRate {
    fn default() -> Self {
        Self {
            scale: FIRING_RATE_SCALE,
        }
    }
}

impl MeanFiringRate {
    /// Creates the statistic with a custom output scale.
    #[must_use]
    pub fn with_scale(scale: f64) -> Self {
        Self { scale }
    }
}

impl BinStatistic for MeanFiringRate {
    fn name(&self) -> &'static str {
        "Firing Rate"
    }

    fn evaluate(&self, train: &SpikeTrain<'_>) -> Result<f64, DegenerateBinError> {
        let span = train.duration_nanos();
        if span == 0 {
            return Err(DegenerateBinError::ZeroSpan);
        }
        Ok(train.len() as f64 / span as f64 * self.scale)
    }
}

/// Coefficient of variation (population stdev over mean) of inter-spike intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CvIsi;

impl BinStatistic for CvIsi {
    fn name(&self) -> &'static str {
        "CV ISI"
    }

    fn evaluate(&self, train: &SpikeTrain<'_>) -> Result<f64, DegenerateBinError> {
        if train.len() < 2 {
            return Err(DegenerateBinError::TooFewSpikes {
                needed: 2,
                found: train.len(),
            });
        }

        let n = (train.len() - 1) as f64;
        let mean = train.intervals().map(|i| i as f64).sum::<f64>() / n;
        if mean <= 0.0 {
            return Err(DegenerateBinError::ZeroSpan);
        }
        let variance = train
            .intervals()
            .map(|i| (i as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        Ok(variance.sqrt() / mean)
    }
}
