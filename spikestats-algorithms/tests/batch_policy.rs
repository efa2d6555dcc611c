use spikestats_algorithms::{
    ClusterId, CombinedSummary, DiscardPlots, FailurePolicy, PipelineConfig, PlotSink,
    RecordingSource, RecordingStatsPipeline, RecordingTraces, SummarySink,
};
use spikestats_core::{BoxError, Error, RawEventTable};
use std::collections::BTreeMap;

fn good_recording(cluster: u32) -> RawEventTable {
    let mut events: Vec<(u32, f64, &str)> = (0..120)
        .map(|i| (cluster, f64::from(i) * 30.0, "Baseline"))
        .collect();
    events.extend((0..60).map(|i| (cluster, 3600.0 + f64::from(i) * 30.0, "CNO")));
    RawEventTable::from_triples(events)
}

fn source() -> BTreeMap<String, RawEventTable> {
    let mut recordings = BTreeMap::new();
    recordings.insert("rec_a".to_string(), good_recording(3));
    // No CNO rows: segmentation fails.
    recordings.insert(
        "rec_bad".to_string(),
        RawEventTable::from_triples([(1, 1.0, "Baseline"), (1, 2.0, "Baseline")]),
    );
    recordings.insert("rec_c".to_string(), good_recording(8));
    recordings
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

struct FailingSink;

impl SummarySink for FailingSink {
    fn persist(&mut self, _summary: &CombinedSummary) -> Result<(), BoxError> {
        Err("disk full".into())
    }
}

struct FailingPlots;

impl PlotSink for FailingPlots {
    fn render(&mut self, _traces: &RecordingTraces) -> Result<(), BoxError> {
        Err("renderer unavailable".into())
    }
}

#[test]
fn test_abort_batch_persists_nothing() {
    let pipeline = RecordingStatsPipeline::default();
    let mut persisted: Option<CombinedSummary> = None;
    let err = pipeline
        .run(
            &names(&["rec_a", "rec_bad", "rec_c"]),
            &source(),
            &mut DiscardPlots,
            &mut persisted,
        )
        .unwrap_err();
    assert!(matches!(err, Error::MissingCondition { ref label } if label == "CNO"));
    assert!(persisted.is_none());
}

#[test]
fn test_skip_recording_keeps_partial_summary() {
    let pipeline = RecordingStatsPipeline::new(
        PipelineConfig::default().with_failure_policy(FailurePolicy::SkipRecording),
    );
    let mut plots: Vec<RecordingTraces> = Vec::new();
    let mut persisted: Option<CombinedSummary> = None;
    let outcome = pipeline
        .run(
            &names(&["rec_a", "rec_bad", "rec_missing", "rec_c"]),
            &source(),
            &mut plots,
            &mut persisted,
        )
        .unwrap();

    let failed: Vec<&str> = outcome
        .failures
        .iter()
        .map(|f| f.recording.as_str())
        .collect();
    assert_eq!(failed, vec!["rec_bad", "rec_missing"]);
    assert!(matches!(outcome.failures[1].error, Error::Load { .. }));

    let summary = persisted.unwrap();
    assert_eq!(summary.recordings(), vec!["rec_a", "rec_c"]);
    assert_eq!(summary.rows()[0].cluster_id, ClusterId::new(3));
    assert_eq!(summary.rows()[1].cluster_id, ClusterId::new(8));
    assert_eq!(plots.len(), 2);
}

#[test]
fn test_empty_batch_persists_empty_summary() {
    let pipeline = RecordingStatsPipeline::default();
    let mut persisted: Option<CombinedSummary> = None;
    let outcome = pipeline
        .run(&[], &source(), &mut DiscardPlots, &mut persisted)
        .unwrap();
    assert!(outcome.summary.is_empty());
    assert_eq!(persisted, Some(CombinedSummary::new()));
}

#[test]
fn test_sink_failures_are_reported() {
    let pipeline = RecordingStatsPipeline::new(
        PipelineConfig::default().with_failure_policy(FailurePolicy::SkipRecording),
    );
    let err = pipeline
        .run(&names(&["rec_a"]), &source(), &mut DiscardPlots, &mut FailingSink)
        .unwrap_err();
    assert!(matches!(err, Error::Sink { .. }));

    let mut persisted: Option<CombinedSummary> = None;
    let outcome = pipeline
        .run(&names(&["rec_a"]), &source(), &mut FailingPlots, &mut persisted)
        .unwrap();
    assert!(matches!(outcome.failures[0].error, Error::Sink { .. }));
    assert!(persisted.unwrap().is_empty());
}

#[test]
fn test_invalid_config_is_rejected_before_loading() {
    struct PanickingSource;
    impl RecordingSource for PanickingSource {
        fn load(&self, _recording: &str) -> Result<RawEventTable, BoxError> {
            panic!("must not be called");
        }
    }

    let pipeline =
        RecordingStatsPipeline::new(PipelineConfig::default().with_firing_rate_scale(0.0));
    let mut persisted: Option<CombinedSummary> = None;
    let err = pipeline
        .run(&names(&["rec_a"]), &PanickingSource, &mut DiscardPlots, &mut persisted)
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(persisted.is_none());
}
