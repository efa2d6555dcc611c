//! Per-neuron spike time series.

use crate::event::NormalizedEventTable;
use crate::time::{ClusterId, SpikeTime};
use std::collections::BTreeMap;

/// Spikes of one neuron at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpikeCount {
    /// Timestamp.
    pub time: SpikeTime,
    /// Number of spikes recorded at exactly this timestamp.
    pub count: u32,
}

/// Sparse time series per neuron, pivoted from a [`NormalizedEventTable`].
///
/// Each neuron's entries are sorted by time with unique timestamps. Neurons
/// without spikes in the source table do not appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeuronTimeSeries {
    series: BTreeMap<ClusterId, Vec<SpikeCount>>,
}

impl NeuronTimeSeries {
    /// Groups spikes by (neuron, timestamp) and counts them.
    #[must_use]
    pub fn pivot(table: &NormalizedEventTable) -> Self {
        let mut grouped: BTreeMap<ClusterId, BTreeMap<SpikeTime, u32>> = BTreeMap::new();
        for ((&cluster, &time), &spike) in table.cluster_id.iter().zip(&table.time).zip(&table.spike)
        {
            *grouped.entry(cluster).or_default().entry(time).or_insert(0) += spike;
        }

        let series = grouped
            .into_iter()
            .map(|(cluster, counts)| {
                let entries = counts
                    .into_iter()
                    .map(|(time, count)| SpikeCount { time, count })
                    .collect();
                (cluster, entries)
            })
            .collect();

        Self { series }
    }

    /// Number of neurons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns true if no neuron has spikes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Neuron ids in ascending order.
    pub fn clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.series.keys().copied()
    }

    /// Entries for one neuron.
    #[must_use]
    pub fn get(&self, cluster: ClusterId) -> Option<&[SpikeCount]> {
        self.series.get(&cluster).map(Vec::as_slice)
    }

    /// Sorted distinct spike times for one neuron.
    #[must_use]
    pub fn times(&self, cluster: ClusterId) -> Vec<SpikeTime> {
        self.get(cluster)
            .map(|entries| entries.iter().map(|e| e.time).collect())
            .unwrap_or_default()
    }

    /// Iterates `(neuron, entries)` in ascending neuron order.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &[SpikeCount])> + '_ {
        self.series.iter().map(|(&c, v)| (c, v.as_slice()))
    }

    /// Total number of spikes across all neurons.
    #[must_use]
    pub fn total_spikes(&self) -> u64 {
        self.series
            .values()
            .flat_map(|entries| entries.iter().map(|e| u64::from(e.count)))
            .sum()
    }
}
