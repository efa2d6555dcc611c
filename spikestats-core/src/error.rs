//! Error types for spikestats-core.

use thiserror::Error;

/// Result type alias for spikestats operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by an external collaborator (loader, sink).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error types for spikestats operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required column is absent from the event table.
    #[error("missing required column `{column}`")]
    Schema { column: String },

    /// A condition label needed for a boundary lookup has no matching rows.
    #[error("no events recorded under condition `{label}`")]
    MissingCondition { label: String },

    /// A row could not be interpreted (malformed number, wrong field count).
    #[error("data integrity error at row {row}: {reason}")]
    DataIntegrity { row: usize, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The recording source failed to produce a table.
    #[error("failed to load recording `{recording}`: {source}")]
    Load {
        recording: String,
        #[source]
        source: BoxError,
    },

    /// A plot or summary sink rejected its input.
    #[error("sink error: {source}")]
    Sink {
        #[source]
        source: BoxError,
    },
}

/// Reasons a single bin cannot yield a statistic.
///
/// Never fatal: the estimator maps every variant to an undefined (`NaN`) bin.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateBinError {
    /// The bin holds no spikes, so it has no stop time.
    #[error("bin contains no spikes")]
    Empty,

    /// Fewer spikes than the statistic requires.
    #[error("bin has {found} spike(s), statistic needs at least {needed}")]
    TooFewSpikes { needed: usize, found: usize },

    /// First and last spike coincide, so the observation window has no length.
    #[error("bin spans zero time")]
    ZeroSpan,
}
