//! spikestats-core: Core types for per-neuron spike statistics.
//!
//! This crate provides the spike event tables, the condition segmenter and
//! the per-neuron time series pivot that feed the binned estimators.
//!

pub mod condition;
pub mod error;
pub mod event;
pub mod series;
pub mod time;

pub use condition::{
    segment_conditions, ConditionSegmentation, ConditionWindow, ExperimentKind, BASELINE, CIT,
    CNO, WAY,
};
pub use error::{BoxError, DegenerateBinError, Error, Result};
pub use event::{NormalizedEventTable, RawEventTable, SpikeEvent};
pub use series::{NeuronTimeSeries, SpikeCount};
pub use time::{ClusterId, SpikeTime, NANOS_PER_SEC};
