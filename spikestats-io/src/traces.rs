//! Plot trace export.
//!
//! Each neuron of a recording becomes one JSON document holding everything a
//! renderer needs: the full-session firing-rate and CV-ISI traces on a
//! minutes axis, the baseline medians, the treatment indicators and the
//! baseline ISI samples for the histogram. Styling travels with the document
//! through an explicit [`PlotStyle`].
#![allow(clippy::cast_precision_loss)]

use crate::Result;
use serde::{Deserialize, Serialize};
use spikestats_algorithms::{ClusterId, ExperimentKind, PlotSink, RecordingTraces};
use spikestats_core::{BoxError, CIT, CNO, WAY};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Label of the firing rate panel.
pub const FIRING_RATE_LABEL: &str = "Firing Rate";
/// Label of the CV-ISI panel.
pub const CV_ISI_LABEL: &str = "CV-ISI";

/// Styling handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    /// Named theme, e.g. `ggplot`.
    pub theme: String,
    /// Figure width and height in inches.
    pub figure_size: (f64, f64),
    /// Width of the statistic traces.
    pub line_width: f64,
    /// Width of the condition indicator bars.
    pub indicator_line_width: f64,
    /// Opacity of the area under each trace.
    pub fill_alpha: f64,
    /// Opacity of the ISI histogram bars.
    pub histogram_alpha: f64,
    /// Visible ISI range in seconds.
    pub isi_x_limit: (f64, f64),
    /// Minute at which each treatment indicator starts, in protocol order.
    pub indicator_start_minutes: Vec<f64>,
    /// Legend names keyed by condition label.
    pub condition_names: BTreeMap<String, String>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        let condition_names = [(CIT, "Citalopram"), (WAY, "WAY"), (CNO, "CNO")]
            .into_iter()
            .map(|(label, name)| (label.to_string(), name.to_string()))
            .collect();
        Self {
            theme: "ggplot".to_string(),
            figure_size: (12.0, 12.0),
            line_width: 1.5,
            indicator_line_width: 4.0,
            fill_alpha: 0.4,
            histogram_alpha: 0.8,
            isi_x_limit: (0.0, 3.5),
            indicator_start_minutes: vec![60.0, 120.0],
            condition_names,
        }
    }
}

impl PlotStyle {
    /// Sets the theme name.
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    /// Sets the legend name of a condition.
    #[must_use]
    pub fn with_condition_name(mut self, label: &str, name: impl Into<String>) -> Self {
        self.condition_names.insert(label.to_string(), name.into());
        self
    }

    /// Legend name for a condition label, falling back to the label.
    #[must_use]
    pub fn condition_name<'a>(&'a self, label: &'a str) -> &'a str {
        self.condition_names.get(label).map_or(label, String::as_str)
    }
}

/// Horizontal bar marking a treatment period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionIndicator {
    /// Legend name.
    pub name: String,
    /// Start of the bar in minutes.
    pub start_minute: f64,
    /// End of the bar in minutes.
    pub end_minute: f64,
}

/// One statistic over the full session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatPanel {
    /// Statistic label.
    pub label: String,
    /// Panel title.
    pub title: String,
    /// Bin positions in minutes, evenly spread over the session.
    pub minutes: Vec<f64>,
    /// One value per bin; undefined bins serialize as `null`.
    pub values: Vec<f64>,
    /// Baseline median of the statistic.
    pub baseline_median: f64,
    /// Treatment indicators.
    pub conditions: Vec<ConditionIndicator>,
}

/// Baseline inter-spike intervals for the histogram panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsiHistogram {
    /// Intervals in seconds.
    pub intervals_secs: Vec<f64>,
    /// Suggested number of histogram bins (a quarter of the samples).
    pub bins: usize,
}

/// Plot document of one neuron.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeuronTrace {
    /// Recording name.
    pub recording: String,
    /// Neuron.
    pub cluster_id: ClusterId,
    /// Protocol.
    pub experiment: ExperimentKind,
    /// Session length in whole minutes.
    pub session_minutes: u64,
    /// Rendering style.
    pub style: PlotStyle,
    /// Firing rate panel followed by the CV-ISI panel.
    pub panels: Vec<StatPanel>,
    /// Baseline ISI histogram.
    pub isi_histogram: IsiHistogram,
}

/// Evenly spaced points from `start` to `stop` inclusive.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Treatment indicators for a recording.
///
/// The primary condition is always shown; the second CIT phase only when it
/// was actually recorded.
fn condition_indicators(traces: &RecordingTraces, style: &PlotStyle) -> Vec<ConditionIndicator> {
    let end_minute = traces.session_minutes() as f64;
    let labels: &[&str] = match traces.experiment {
        ExperimentKind::Dreadd => &[CNO],
        ExperimentKind::Cit if traces.segmentation.n_conditions >= 2 => &[CIT, WAY],
        ExperimentKind::Cit => &[CIT],
    };
    labels
        .iter()
        .zip(&style.indicator_start_minutes)
        .map(|(label, &start_minute)| ConditionIndicator {
            name: style.condition_name(label).to_string(),
            start_minute,
            end_minute,
        })
        .collect()
}

/// Builds the plot documents of every neuron in a recording.
#[must_use]
pub fn neuron_traces(traces: &RecordingTraces, style: &PlotStyle) -> Vec<NeuronTrace> {
    let session_minutes = traces.session_minutes();
    let conditions = condition_indicators(traces, style);

    traces
        .firing_rate
        .iter()
        .map(|(cluster_id, rates)| {
            let baseline = traces.baseline.row(cluster_id);
            let panel = |label: &str, values: &[f64], median: f64| StatPanel {
                label: label.to_string(),
                title: format!("{label} over time.\nCluster {cluster_id}"),
                minutes: linspace(0.0, session_minutes as f64, values.len()),
                values: values.to_vec(),
                baseline_median: median,
                conditions: conditions.clone(),
            };
            let cvs = traces.cv_isi.get(cluster_id).unwrap_or_default();
            let intervals_secs = traces
                .baseline_isis
                .get(&cluster_id)
                .cloned()
                .unwrap_or_default();

            NeuronTrace {
                recording: traces.recording.clone(),
                cluster_id,
                experiment: traces.experiment,
                session_minutes,
                style: style.clone(),
                panels: vec![
                    panel(
                        FIRING_RATE_LABEL,
                        rates,
                        baseline.map_or(f64::NAN, |r| r.firing_rate),
                    ),
                    panel(CV_ISI_LABEL, cvs, baseline.map_or(f64::NAN, |r| r.cv_isi)),
                ],
                isi_histogram: IsiHistogram {
                    bins: (intervals_secs.len() / 4).max(1),
                    intervals_secs,
                },
            }
        })
        .collect()
}

/// Writes plot documents to `<fig_folder>/<recording>/cluster_<id>.json`.
#[derive(Debug, Clone)]
pub struct TraceWriter {
    fig_folder: PathBuf,
    style: PlotStyle,
}

impl TraceWriter {
    /// Creates a writer.
    pub fn new<P: Into<PathBuf>>(fig_folder: P, style: PlotStyle) -> Self {
        Self {
            fig_folder: fig_folder.into(),
            style,
        }
    }

    /// Style embedded in every document.
    #[must_use]
    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    /// Folder holding one recording's documents.
    #[must_use]
    pub fn recording_dir(&self, recording: &str) -> PathBuf {
        self.fig_folder.join(recording)
    }

    /// Writes every neuron of a recording and returns the written paths.
    ///
    /// # Errors
    /// Returns an error if a folder or file cannot be written.
    pub fn write(&self, traces: &RecordingTraces) -> Result<Vec<PathBuf>> {
        let dir = self.recording_dir(&traces.recording);
        fs::create_dir_all(&dir)?;

        let mut written = Vec::new();
        for doc in neuron_traces(traces, &self.style) {
            let path = dir.join(format!("cluster_{}.json", doc.cluster_id));
            write_json(&path, &doc)?;
            written.push(path);
        }
        log::debug!(
            "{}: wrote {} plot document(s) to {}",
            traces.recording,
            written.len(),
            dir.display()
        );
        Ok(written)
    }
}

impl PlotSink for TraceWriter {
    fn render(&mut self, traces: &RecordingTraces) -> std::result::Result<(), BoxError> {
        self.write(traces).map(|_| ()).map_err(Into::into)
    }
}

fn write_json(path: &Path, doc: &NeuronTrace) -> Result<()> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), doc)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use spikestats_algorithms::{BinnedStatTable, RecordingSummary, SummaryRow};
    use spikestats_core::{ConditionSegmentation, ConditionWindow, SpikeTime};
    use tempfile::TempDir;

    fn traces(experiment: ExperimentKind, n_conditions: usize) -> RecordingTraces {
        let mut firing_rate = BinnedStatTable::new("Firing Rate");
        firing_rate
            .values
            .insert(ClusterId::new(2), vec![10.0, f64::NAN, 12.0]);
        let mut cv_isi = BinnedStatTable::new("CV ISI");
        cv_isi.values.insert(ClusterId::new(2), vec![0.2, 0.3, 0.4]);
        let end = SpikeTime::from_nanos(360 * 1_000_000_000);
        RecordingTraces {
            recording: "rec_x".to_string(),
            experiment,
            segmentation: ConditionSegmentation {
                windows: vec![ConditionWindow::new(CIT, end), ConditionWindow::new(WAY, end)],
                n_conditions,
            },
            session_end_secs: 360.0,
            bin_width_minutes: 2.0,
            firing_rate,
            cv_isi,
            baseline: RecordingSummary {
                recording: "rec_x".to_string(),
                rows: vec![SummaryRow {
                    cluster_id: ClusterId::new(2),
                    cv_isi: 0.25,
                    firing_rate: 11.0,
                }],
            },
            baseline_isis: [(ClusterId::new(2), vec![0.5; 8])].into(),
        }
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 6.0, 3), vec![0.0, 3.0, 6.0]);
        assert_eq!(linspace(0.0, 6.0, 1), vec![0.0]);
        assert!(linspace(0.0, 6.0, 0).is_empty());
    }

    #[test]
    fn test_neuron_trace_contents() {
        let docs = neuron_traces(&traces(ExperimentKind::Cit, 2), &PlotStyle::default());
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.session_minutes, 6);
        assert_eq!(doc.panels[0].label, FIRING_RATE_LABEL);
        assert_eq!(doc.panels[0].minutes, vec![0.0, 3.0, 6.0]);
        assert_eq!(doc.panels[0].baseline_median, 11.0);
        assert_eq!(doc.panels[1].baseline_median, 0.25);
        assert_eq!(doc.isi_histogram.bins, 2);

        let names: Vec<&str> = doc.panels[0]
            .conditions
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Citalopram", "WAY"]);
        assert_eq!(doc.panels[0].conditions[1].start_minute, 120.0);
    }

    #[test]
    fn test_single_phase_cit_shows_one_indicator() {
        let docs = neuron_traces(&traces(ExperimentKind::Cit, 1), &PlotStyle::default());
        assert_eq!(docs[0].panels[1].conditions.len(), 1);

        let style = PlotStyle::default().with_condition_name(CNO, "Clozapine-N-oxide");
        let docs = neuron_traces(&traces(ExperimentKind::Dreadd, 1), &style);
        assert_eq!(docs[0].panels[0].conditions[0].name, "Clozapine-N-oxide");
    }

    #[test]
    fn test_trace_writer_outputs_json_per_neuron() {
        let tmp = TempDir::new().unwrap();
        let mut writer = TraceWriter::new(tmp.path(), PlotStyle::default().with_theme("classic"));
        writer.render(&traces(ExperimentKind::Cit, 2)).unwrap();

        let path = tmp.path().join("rec_x").join("cluster_2.json");
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(doc["style"]["theme"], "classic");
        assert_eq!(doc["cluster_id"], 2);
        assert_eq!(doc["experiment"], "CIT");
        assert!(doc["panels"][0]["values"][1].is_null());
        assert_eq!(doc["panels"][1]["values"][2], 0.4);
    }
}
