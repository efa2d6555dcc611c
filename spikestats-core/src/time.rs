//! Spike timestamps and neuron identities.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Sorted-spike source label (the `spike_cluster` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ClusterId(pub u32);

impl ClusterId {
    /// Creates a new cluster id.
    #[inline]
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw label.
    #[inline]
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time since recording start, held as integer nanoseconds.
///
/// All downstream time arithmetic (partition spans, inter-spike intervals)
/// runs on this representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct SpikeTime(pub u64);

impl SpikeTime {
    /// Creates a timestamp from raw nanoseconds.
    #[inline]
    #[must_use]
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Converts seconds to the nearest nanosecond.
    ///
    /// # Errors
    /// Returns [`Error::DataIntegrity`] (row 0) for non-finite, negative or
    /// out-of-range values; callers that know the row rewrap it.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_secs_f64(secs: f64) -> Result<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(Error::DataIntegrity {
                row: 0,
                reason: format!("time {secs} is not a finite non-negative number of seconds"),
            });
        }
        let nanos = (secs * NANOS_PER_SEC as f64).round();
        if nanos >= u64::MAX as f64 {
            return Err(Error::DataIntegrity {
                row: 0,
                reason: format!("time {secs} s overflows the nanosecond range"),
            });
        }
        Ok(Self(nanos as u64))
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Returns the time in seconds.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Nanoseconds elapsed from `earlier` to `self` (zero if `earlier` is later).
    #[inline]
    #[must_use]
    pub fn saturating_since(&self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}
