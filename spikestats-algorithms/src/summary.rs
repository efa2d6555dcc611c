//! Per-neuron medians and recording summary tables.

use crate::binning::BinnedStatTable;
use spikestats_core::ClusterId;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How undefined (`NaN`) bins take part in a median.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum MedianPolicy {
    /// Drop undefined bins, then take the median of what remains.
    #[default]
    SkipUndefined,
    /// Any undefined bin makes the median undefined.
    Propagate,
}

/// Median of `values` under `policy`.
///
/// Even counts average the two middle values. No values (after dropping
/// undefined ones) gives `NaN`.
#[must_use]
pub fn median(values: &[f64], policy: MedianPolicy) -> f64 {
    if policy == MedianPolicy::Propagate && values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if defined.is_empty() {
        return f64::NAN;
    }
    defined.sort_by(f64::total_cmp);
    let mid = defined.len() / 2;
    if defined.len() % 2 == 0 {
        (defined[mid - 1] + defined[mid]) / 2.0
    } else {
        defined[mid]
    }
}

/// One median per neuron over all of its bins.
#[must_use]
pub fn medians(table: &BinnedStatTable, policy: MedianPolicy) -> BTreeMap<ClusterId, f64> {
    table
        .iter()
        .map(|(cluster, bins)| (cluster, median(bins, policy)))
        .collect()
}

/// Baseline medians of one neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SummaryRow {
    /// Neuron.
    pub cluster_id: ClusterId,
    /// Median CV-ISI.
    pub cv_isi: f64,
    /// Median firing rate.
    pub firing_rate: f64,
}

/// Baseline medians of every neuron in a recording.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordingSummary {
    /// Recording name.
    pub recording: String,
    /// One row per neuron, ascending by id.
    pub rows: Vec<SummaryRow>,
}

impl RecordingSummary {
    /// Joins CV-ISI and firing-rate medians by neuron.
    ///
    /// Outer join: a neuron present on one side only gets `NaN` on the other.
    #[must_use]
    pub fn join(
        recording: impl Into<String>,
        cv_isi: &BTreeMap<ClusterId, f64>,
        firing_rate: &BTreeMap<ClusterId, f64>,
    ) -> Self {
        let clusters: BTreeSet<ClusterId> =
            cv_isi.keys().chain(firing_rate.keys()).copied().collect();
        let rows = clusters
            .into_iter()
            .map(|cluster_id| SummaryRow {
                cluster_id,
                cv_isi: cv_isi.get(&cluster_id).copied().unwrap_or(f64::NAN),
                firing_rate: firing_rate.get(&cluster_id).copied().unwrap_or(f64::NAN),
            })
            .collect();
        Self {
            recording: recording.into(),
            rows,
        }
    }

    /// Row for one neuron.
    #[must_use]
    pub fn row(&self, cluster: ClusterId) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.cluster_id == cluster)
    }

    /// Number of neurons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no neuron was summarized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of the multi-recording summary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CombinedRow {
    /// Median CV-ISI.
    pub cv_isi: f64,
    /// Median firing rate.
    pub firing_rate: f64,
    /// Recording name.
    pub recording: String,
    /// Neuron.
    pub cluster_id: ClusterId,
}

/// Summary rows of all processed recordings.
///
/// A row's position is its dense 0-based index.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CombinedSummary {
    rows: Vec<CombinedRow>,
}

impl CombinedSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing rows, e.g. when reading a persisted table.
    #[must_use]
    pub fn from_rows(rows: Vec<CombinedRow>) -> Self {
        Self { rows }
    }

    /// Appends a recording's rows, tagged with its name.
    pub fn append(&mut self, summary: &RecordingSummary) {
        self.rows.extend(summary.rows.iter().map(|r| CombinedRow {
            cv_isi: r.cv_isi,
            firing_rate: r.firing_rate,
            recording: summary.recording.clone(),
            cluster_id: r.cluster_id,
        }));
    }

    /// Rows in index order.
    #[must_use]
    pub fn rows(&self) -> &[CombinedRow] {
        &self.rows
    }

    /// Iterates `(index, row)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &CombinedRow)> + '_ {
        self.rows.iter().enumerate()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the summary has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct recording names in order of appearance.
    #[must_use]
    pub fn recordings(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.recording.as_str()) {
                seen.push(row.recording.as_str());
            }
        }
        seen
    }
}
