//! Analysis options file.

use serde::{Deserialize, Serialize};
use spikestats_algorithms::{FailurePolicy, MedianPolicy, PipelineConfig};
use spikestats_core::ExperimentKind;
use std::fs;
use std::path::{Path, PathBuf};

/// Options of one batch analysis, as stored in a JSON options file.
///
/// Every field may be omitted; command-line flags override file values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Recording names, processed in this order.
    pub recordings_to_analyse: Vec<String>,
    /// Folder holding one sub-folder per recording.
    pub data_dir: PathBuf,
    /// Experiment protocol.
    pub experiment: ExperimentKind,
    /// Destination of the per-neuron plot documents.
    pub fig_folder: PathBuf,
    /// Destination of `spike_stats.csv`.
    pub temp_folder: PathBuf,
    /// Report progress per recording.
    pub verbose: bool,
    /// Handling of undefined bins in medians.
    pub median_policy: MedianPolicy,
    /// Handling of failing recordings.
    pub failure_policy: FailurePolicy,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            recordings_to_analyse: Vec::new(),
            data_dir: PathBuf::from("."),
            experiment: ExperimentKind::Dreadd,
            fig_folder: PathBuf::from("figures"),
            temp_folder: PathBuf::from("temp"),
            verbose: false,
            median_policy: MedianPolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AnalysisOptions {
    /// Reads options from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> spikestats_io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Pipeline configuration for these options.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(self.experiment)
            .with_median_policy(self.median_policy)
            .with_failure_policy(self.failure_policy)
    }

    /// Checks that there is something to analyse.
    ///
    /// # Errors
    /// Returns [`spikestats_core::Error::Config`] when no recording is listed.
    pub fn validate(&self) -> spikestats_core::Result<()> {
        if self.recordings_to_analyse.is_empty() {
            return Err(spikestats_core::Error::Config(
                "no recordings to analyse".to_string(),
            ));
        }
        Ok(())
    }
}
