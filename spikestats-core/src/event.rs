//! Spike event tables.
//!
//! A recording arrives as a [`RawEventTable`]: the header row and string
//! fields of a tabular file, one row per detected spike. Normalization checks
//! the schema, parses every row and stores the result column-wise in a
//! [`NormalizedEventTable`]. Rows keep their file order; nothing is
//! assumed about time ordering.

use crate::time::{ClusterId, SpikeTime};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Column holding spike times in seconds.
pub const TIME_COLUMN: &str = "time";
/// Column holding the experimental condition label.
pub const CONDITION_COLUMN: &str = "condition";
/// Cluster column name used by recording files.
pub const CLUSTER_COLUMN: &str = "spike_cluster";
/// Accepted alias for [`CLUSTER_COLUMN`].
pub const CLUSTER_COLUMN_ALIAS: &str = "cluster_id";

/// One detected spike.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpikeEvent {
    /// Neuron identity.
    pub cluster_id: ClusterId,
    /// Time since recording start.
    pub time: SpikeTime,
    /// Experimental condition label, e.g. `Baseline` or `CNO`.
    pub condition: String,
}

impl SpikeEvent {
    /// Creates an event from a time in seconds.
    ///
    /// # Errors
    /// Returns [`Error::DataIntegrity`] if `secs` is not a valid time.
    pub fn new(cluster_id: u32, secs: f64, condition: impl Into<String>) -> Result<Self> {
        Ok(Self {
            cluster_id: ClusterId::new(cluster_id),
            time: SpikeTime::from_secs_f64(secs)?,
            condition: condition.into(),
        })
    }
}

/// Event table as loaded from disk: headers plus unparsed fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEventTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawEventTable {
    /// Creates an empty table with the given headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a `spike_cluster,time,condition` table from `(cluster, seconds, condition)` triples.
    pub fn from_triples<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = (u32, f64, &'a str)>,
    {
        let mut table = Self::new([CLUSTER_COLUMN, TIME_COLUMN, CONDITION_COLUMN]);
        for (cluster, secs, condition) in events {
            table.push_row([cluster.to_string(), secs.to_string(), condition.to_string()]);
        }
        table
    }

    /// Appends one row of fields.
    pub fn push_row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(fields.into_iter().map(Into::into).collect());
    }

    /// Column names.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Unparsed rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::Schema {
            column: name.to_string(),
        })
    }
}

/// Normalized spike table in Structure of Arrays layout.
///
/// Every column has one entry per spike. `spike` is always 1 and serves as
/// the aggregation weight when pivoting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedEventTable {
    /// Neuron identity per spike.
    pub cluster_id: Vec<ClusterId>,
    /// Spike time per spike.
    pub time: Vec<SpikeTime>,
    /// Condition label per spike.
    pub condition: Vec<String>,
    /// Unit weight per spike.
    pub spike: Vec<u32>,
}

impl NormalizedEventTable {
    /// Creates an empty table with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cluster_id: Vec::with_capacity(capacity),
            time: Vec::with_capacity(capacity),
            condition: Vec::with_capacity(capacity),
            spike: Vec::with_capacity(capacity),
        }
    }

    /// Validates and parses a raw table.
    ///
    /// Row numbers in errors are 1-based data rows (the header is not counted).
    ///
    /// # Errors
    /// - [`Error::Schema`] if `time`, `condition` or the cluster column is missing.
    /// - [`Error::DataIntegrity`] if a row has too few fields or a field does
    ///   not parse.
    pub fn from_raw(raw: &RawEventTable) -> Result<Self> {
        let cluster_idx = raw
            .column_index(CLUSTER_COLUMN)
            .or_else(|| raw.column_index(CLUSTER_COLUMN_ALIAS))
            .ok_or_else(|| Error::Schema {
                column: CLUSTER_COLUMN.to_string(),
            })?;
        let time_idx = raw.require_column(TIME_COLUMN)?;
        let condition_idx = raw.require_column(CONDITION_COLUMN)?;
        let width = cluster_idx.max(time_idx).max(condition_idx) + 1;

        let mut table = Self::with_capacity(raw.len());
        for (i, fields) in raw.rows().iter().enumerate() {
            let row = i + 1;
            if fields.len() < width {
                return Err(Error::DataIntegrity {
                    row,
                    reason: format!("expected at least {width} fields, found {}", fields.len()),
                });
            }

            let cluster_field = fields[cluster_idx].trim();
            let cluster = parse_cluster(cluster_field).ok_or_else(|| Error::DataIntegrity {
                row,
                reason: format!("invalid cluster id `{cluster_field}`"),
            })?;

            let time_field = fields[time_idx].trim();
            let secs: f64 = time_field.parse().map_err(|_| Error::DataIntegrity {
                row,
                reason: format!("invalid time `{time_field}`"),
            })?;
            let time = SpikeTime::from_secs_f64(secs).map_err(|err| match err {
                Error::DataIntegrity { reason, .. } => Error::DataIntegrity { row, reason },
                other => other,
            })?;

            table.push(cluster, time, fields[condition_idx].trim());
        }

        log::debug!("normalized {} spike events", table.len());
        Ok(table)
    }

    /// Builds a table directly from parsed events.
    #[must_use]
    pub fn from_events(events: &[SpikeEvent]) -> Self {
        let mut table = Self::with_capacity(events.len());
        for event in events {
            table.push(event.cluster_id, event.time, &event.condition);
        }
        table
    }

    /// Appends a single spike.
    pub fn push(&mut self, cluster_id: ClusterId, time: SpikeTime, condition: &str) {
        self.cluster_id.push(cluster_id);
        self.time.push(time);
        self.condition.push(condition.to_string());
        self.spike.push(1);
    }

    /// Returns the number of spikes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Returns a new table holding only the rows labelled `label`.
    #[must_use]
    pub fn filter_condition(&self, label: &str) -> Self {
        let mut out = Self::default();
        for i in (0..self.len()).filter(|&i| self.condition[i] == label) {
            out.cluster_id.push(self.cluster_id[i]);
            out.time.push(self.time[i]);
            out.condition.push(self.condition[i].clone());
            out.spike.push(self.spike[i]);
        }
        out
    }

    /// Returns true if any row carries `label`.
    #[must_use]
    pub fn contains_condition(&self, label: &str) -> bool {
        self.condition.iter().any(|c| c == label)
    }

    /// Latest timestamp among rows labelled `label`.
    #[must_use]
    pub fn last_time(&self, label: &str) -> Option<SpikeTime> {
        self.condition
            .iter()
            .zip(&self.time)
            .filter(|(c, _)| *c == label)
            .map(|(_, &t)| t)
            .max()
    }

    /// Distinct condition labels in order of first appearance.
    #[must_use]
    pub fn conditions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for c in &self.condition {
            if !seen.contains(&c.as_str()) {
                seen.push(c.as_str());
            }
        }
        seen
    }

    /// Iterates rows as [`SpikeEvent`]s.
    pub fn events(&self) -> impl Iterator<Item = SpikeEvent> + '_ {
        (0..self.len()).map(|i| SpikeEvent {
            cluster_id: self.cluster_id[i],
            time: self.time[i],
            condition: self.condition[i].clone(),
        })
    }
}

/// Parses a cluster label, accepting integral floats such as `12.0`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn parse_cluster(field: &str) -> Option<ClusterId> {
    if let Ok(id) = field.parse::<u32>() {
        return Some(ClusterId::new(id));
    }
    let value: f64 = field.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Some(ClusterId::new(value as u32))
    } else {
        None
    }
}
