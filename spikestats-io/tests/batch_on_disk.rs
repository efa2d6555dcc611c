#![allow(clippy::cast_precision_loss)]
use approx::assert_relative_eq;
use spikestats_algorithms::{
    ClusterId, FailurePolicy, PipelineConfig, RecordingStatsPipeline, FIRING_RATE_SCALE,
};
use spikestats_core::{ExperimentKind, NANOS_PER_SEC};
use spikestats_io::{
    read_summary_csv, PlotStyle, RecordingDirectory, SummaryCsvWriter, TraceWriter,
};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Writes a recording with one spike every `isi` seconds per cluster:
/// baseline for the first hour, then `treatment` for another hour.
fn write_recording(data_dir: &Path, name: &str, clusters: &[(u32, f64)], treatment: &str) {
    let mut csv = String::from(",spike_cluster,time,condition\n");
    let mut row = 0;
    for &(cluster, isi) in clusters {
        let mut t = 0.0;
        while t < 7200.0 {
            let condition = if t < 3600.0 { "Baseline" } else { treatment };
            writeln!(csv, "{row},{cluster},{t:.4},{condition}").unwrap();
            row += 1;
            t += isi;
        }
    }
    let dir = data_dir.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{name}.csv")), csv).unwrap();
}

#[test]
fn test_directory_batch_writes_summary_and_traces() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    write_recording(&data_dir, "rat_01", &[(0, 0.5), (5, 2.0)], "CNO");
    write_recording(&data_dir, "rat_02", &[(1, 1.0)], "CNO");
    // Wrong protocol labels: skipped under SkipRecording.
    write_recording(&data_dir, "rat_03", &[(1, 1.0)], "CIT");

    let source = RecordingDirectory::new(&data_dir);
    let mut plots = TraceWriter::new(tmp.path().join("figs"), PlotStyle::default());
    let mut sink = SummaryCsvWriter::new(tmp.path().join("temp"));
    let pipeline = RecordingStatsPipeline::new(
        PipelineConfig::new(ExperimentKind::Dreadd)
            .with_failure_policy(FailurePolicy::SkipRecording),
    );

    let recordings: Vec<String> = ["rat_01", "rat_02", "rat_03"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let outcome = pipeline
        .run(&recordings, &source, &mut plots, &mut sink)
        .unwrap();
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].recording, "rat_03");

    let summary = read_summary_csv(tmp.path().join("temp").join("spike_stats.csv")).unwrap();
    assert_eq!(summary.len(), 3);
    assert_eq!(summary.recordings(), vec!["rat_01", "rat_02"]);

    let hz = |rate: f64| rate * NANOS_PER_SEC as f64 / FIRING_RATE_SCALE;
    let rows = summary.rows();
    assert_eq!(rows[0].cluster_id, ClusterId::new(0));
    assert_relative_eq!(hz(rows[0].firing_rate), 2.0, max_relative = 0.02);
    assert_relative_eq!(hz(rows[1].firing_rate), 0.5, max_relative = 0.05);
    assert_relative_eq!(hz(rows[2].firing_rate), 1.0, max_relative = 0.02);
    for row in rows {
        assert_relative_eq!(row.cv_isi, 0.0, epsilon = 1e-6);
    }

    for path in ["rat_01/cluster_0.json", "rat_01/cluster_5.json", "rat_02/cluster_1.json"] {
        assert!(tmp.path().join("figs").join(path).is_file(), "{path} missing");
    }
    assert!(!tmp.path().join("figs").join("rat_03").exists());
}

#[test]
fn test_malformed_recording_aborts_batch() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("rat_09");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("rat_09.csv"),
        "spike_cluster,time,condition\n1,0.5,Baseline\n1,oops,CNO\n",
    )
    .unwrap();

    let mut sink = SummaryCsvWriter::new(tmp.path().join("temp"));
    let err = RecordingStatsPipeline::default()
        .run(
            &["rat_09".to_string()],
            &RecordingDirectory::new(tmp.path()),
            &mut spikestats_algorithms::DiscardPlots,
            &mut sink,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        spikestats_core::Error::DataIntegrity { row: 2, .. }
    ));
    assert!(!sink.path().exists());
}
