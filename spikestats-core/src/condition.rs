//! Experimental condition boundaries.
//!
//! Each experiment protocol marks treatment phases with condition labels on
//! the spike rows. The boundary of a phase is the latest spike carrying its
//! label. The last boundary in use defines the full-session duration that
//! the binning stage works over.

use crate::event::NormalizedEventTable;
use crate::time::SpikeTime;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pre-treatment condition label.
pub const BASELINE: &str = "Baseline";
/// Clozapine-N-oxide (DREADD activation) label.
pub const CNO: &str = "CNO";
/// Citalopram label.
pub const CIT: &str = "CIT";
/// WAY-100635 label (follows citalopram).
pub const WAY: &str = "WAY";

/// Experiment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExperimentKind {
    /// Single drug challenge (`CNO`).
    #[cfg_attr(feature = "serde", serde(rename = "DREADD"))]
    Dreadd,
    /// Sequential citalopram then optional WAY (`CIT`, `WAY`).
    #[cfg_attr(feature = "serde", serde(rename = "CIT"))]
    Cit,
}

impl ExperimentKind {
    /// Protocol name as written in configuration files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dreadd => "DREADD",
            Self::Cit => "CIT",
        }
    }
}

impl std::fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExperimentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DREADD" => Ok(Self::Dreadd),
            "CIT" => Ok(Self::Cit),
            other => Err(Error::Config(format!(
                "unknown experiment `{other}` (expected DREADD or CIT)"
            ))),
        }
    }
}

/// A condition label and the last spike time observed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConditionWindow {
    /// Condition label.
    pub label: String,
    /// Latest spike time carrying the label.
    pub last_time: SpikeTime,
}

impl ConditionWindow {
    /// Creates a window.
    #[must_use]
    pub fn new(label: impl Into<String>, last_time: SpikeTime) -> Self {
        Self {
            label: label.into(),
            last_time,
        }
    }

    /// Boundary in seconds.
    #[must_use]
    pub fn last_secs(&self) -> f64 {
        self.last_time.as_secs_f64()
    }
}

/// Output of the condition segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConditionSegmentation {
    /// Ordered windows: `[CNO]` for DREADD, `[CIT, WAY]` for CIT.
    pub windows: Vec<ConditionWindow>,
    /// Number of treatment phases actually present (1 or 2).
    pub n_conditions: usize,
}

impl ConditionSegmentation {
    /// Boundary that ends the analysed session.
    ///
    /// The first window for single-condition recordings, the second when two
    /// conditions are present.
    #[must_use]
    pub fn session_end(&self) -> SpikeTime {
        let idx = if self.n_conditions >= 2 { 1 } else { 0 };
        self.windows
            .get(idx)
            .or_else(|| self.windows.first())
            .map_or(SpikeTime::default(), |w| w.last_time)
    }

    /// Window for a given label, if one was produced.
    #[must_use]
    pub fn window(&self, label: &str) -> Option<&ConditionWindow> {
        self.windows.iter().find(|w| w.label == label)
    }
}

/// Determines the condition windows of a recording.
///
/// # Errors
/// Returns [`Error::MissingCondition`] if the protocol's primary label
/// (`CNO` for DREADD, `CIT` for CIT) has no rows.
pub fn segment_conditions(
    table: &NormalizedEventTable,
    experiment: ExperimentKind,
) -> Result<ConditionSegmentation> {
    let segmentation = match experiment {
        ExperimentKind::Dreadd => ConditionSegmentation {
            windows: vec![ConditionWindow::new(CNO, require_last(table, CNO)?)],
            n_conditions: 1,
        },
        ExperimentKind::Cit => {
            let cit = require_last(table, CIT)?;
            match table.last_time(WAY) {
                Some(way) => ConditionSegmentation {
                    windows: vec![ConditionWindow::new(CIT, cit), ConditionWindow::new(WAY, way)],
                    n_conditions: 2,
                },
                None => ConditionSegmentation {
                    windows: vec![ConditionWindow::new(CIT, cit), ConditionWindow::new(WAY, cit)],
                    n_conditions: 1,
                },
            }
        }
    };

    log::debug!(
        "{experiment} segmentation: {} condition(s), session ends at {:.3} s",
        segmentation.n_conditions,
        segmentation.session_end().as_secs_f64()
    );
    Ok(segmentation)
}

fn require_last(table: &NormalizedEventTable, label: &str) -> Result<SpikeTime> {
    table
        .last_time(label)
        .ok_or_else(|| Error::MissingCondition {
            label: label.to_string(),
        })
}
