//! spikestats-io: File I/O for spikestats.
//!
//! This crate provides the CSV recording loader, persistence of the combined
//! summary table and JSON export of per-neuron plot traces. Each type plugs
//! into the batch pipeline through its collaborator trait.
//!

mod error;
mod reader;
pub mod traces;
mod writer;

pub use error::{Error, Result};
pub use reader::{read_event_csv, RecordingDirectory};
pub use traces::{neuron_traces, NeuronTrace, PlotStyle, TraceWriter};
pub use writer::{
    read_summary_csv, write_summary_csv, SummaryCsvWriter, SUMMARY_COLUMNS, SUMMARY_FILE_NAME,
};
