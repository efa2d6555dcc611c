#![allow(clippy::cast_precision_loss, clippy::float_cmp)]
use approx::assert_relative_eq;
use spikestats_algorithms::{
    BinnedStatisticEstimator, BinningConfig, ClusterId, CombinedSummary, CvIsi, ExperimentKind,
    MeanFiringRate, MedianPolicy, PipelineConfig, RecordingStatsPipeline, RecordingTraces,
    FIRING_RATE_SCALE,
};
use spikestats_core::{
    NeuronTimeSeries, NormalizedEventTable, RawEventTable, BASELINE, NANOS_PER_SEC,
};
use std::collections::HashMap;

/// Firing rate reported for a neuron firing at `hz`.
fn scaled(hz: f64) -> f64 {
    hz * FIRING_RATE_SCALE / NANOS_PER_SEC as f64
}

/// Deterministic linear congruential generator for jittered spike trains.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Spike times with interval `mean ± jitter` (uniform) in `[start, end)`.
fn jittered_train(rng: &mut Lcg, mean: f64, jitter: f64, start: f64, end: f64) -> Vec<f64> {
    let mut t = start + rng.next_f64() * mean;
    let mut times = Vec::new();
    while t < end {
        times.push(t);
        t += mean + (rng.next_f64() * 2.0 - 1.0) * jitter;
    }
    times
}

/// Two neurons: A fires every ~1 s with low jitter, B every ~5 s with high jitter.
/// 120 minutes of Baseline, then 60 minutes of CNO.
fn two_neuron_recording() -> RawEventTable {
    let mut rng = Lcg(42);
    let mut table = RawEventTable::new(["spike_cluster", "time", "condition", "amplitude"]);
    let trains = [
        (11, jittered_train(&mut rng, 1.0, 0.1, 0.0, 7200.0), "Baseline"),
        (23, jittered_train(&mut rng, 5.0, 4.5, 0.0, 7200.0), "Baseline"),
        (11, jittered_train(&mut rng, 1.0, 0.1, 7200.0, 10_800.0), "CNO"),
        (23, jittered_train(&mut rng, 5.0, 4.5, 7200.0, 10_800.0), "CNO"),
    ];
    for (cluster, times, condition) in trains {
        for t in times {
            table.push_row([
                cluster.to_string(),
                format!("{t:.6}"),
                condition.to_string(),
                "55.0".to_string(),
            ]);
        }
    }
    table
}

#[test]
fn test_two_neuron_baseline_summary() {
    let source: HashMap<String, RawEventTable> =
        [("rec_01".to_string(), two_neuron_recording())].into();
    let pipeline = RecordingStatsPipeline::new(PipelineConfig::new(ExperimentKind::Dreadd));
    let mut plots: Vec<RecordingTraces> = Vec::new();
    let mut persisted: Option<CombinedSummary> = None;

    let outcome = pipeline
        .run(&["rec_01".to_string()], &source, &mut plots, &mut persisted)
        .unwrap();

    assert!(outcome.failures.is_empty());
    let summary = persisted.unwrap();
    assert_eq!(summary, outcome.summary);
    assert_eq!(summary.len(), 2);

    let a = &summary.rows()[0];
    let b = &summary.rows()[1];
    assert_eq!(a.cluster_id, ClusterId::new(11));
    assert_eq!(b.cluster_id, ClusterId::new(23));
    assert_eq!(a.recording, "rec_01");

    assert_relative_eq!(a.firing_rate, scaled(1.0), max_relative = 0.05);
    assert_relative_eq!(b.firing_rate, scaled(0.2), max_relative = 0.05);
    assert!(a.cv_isi < b.cv_isi);
    assert!(a.cv_isi < 0.1, "A should be nearly regular, got {}", a.cv_isi);
    assert!(b.cv_isi > 0.3, "B should be irregular, got {}", b.cv_isi);
}

#[test]
fn test_bin_counts_for_baseline_and_session() {
    let raw = two_neuron_recording();
    let pipeline = RecordingStatsPipeline::new(PipelineConfig::new(ExperimentKind::Dreadd));
    let (summary, traces) = pipeline.process_recording("rec_01", &raw).unwrap();
    assert_eq!(summary.len(), 2);

    let baseline = NeuronTimeSeries::pivot(
        &NormalizedEventTable::from_raw(&raw)
            .unwrap()
            .filter_condition(BASELINE),
    );
    let estimator = BinnedStatisticEstimator::new(BinningConfig::baseline());
    let rates = estimator.estimate_all(&baseline, &MeanFiringRate::default());
    let cvs = estimator.estimate_all(&baseline, &CvIsi);
    for cluster in [ClusterId::new(11), ClusterId::new(23)] {
        assert_eq!(rates.get(cluster).unwrap().len(), 30);
        assert_eq!(cvs.get(cluster).unwrap().len(), 30);
        assert!(rates.get(cluster).unwrap().iter().all(|r| r.is_finite()));
    }

    // CNO ends just before 10 800 s, so 179 whole minutes -> 89 bins.
    assert_eq!(traces.session_minutes(), 179);
    for cluster in [ClusterId::new(11), ClusterId::new(23)] {
        assert_eq!(traces.firing_rate.get(cluster).unwrap().len(), 89);
        assert_eq!(traces.cv_isi.get(cluster).unwrap().len(), 89);
        assert!(traces.baseline_isis[&cluster].iter().all(|&isi| isi > 0.0));
    }
    assert_eq!(traces.segmentation.n_conditions, 1);
    assert_eq!(traces.baseline, summary);
}

#[test]
fn test_propagating_median_with_undefined_bins() {
    // Neuron 1 fires every 90 s: 40 baseline spikes for 30 bins. Ten bins
    // hold 2 spikes, twenty hold 1 and have no defined CV-ISI.
    let mut events: Vec<(u32, f64, &str)> = (0..40)
        .map(|i| (1, f64::from(i) * 90.0, "Baseline"))
        .collect();
    events.push((1, 4000.0, "CNO"));
    let raw = RawEventTable::from_triples(events);

    let skip = RecordingStatsPipeline::new(PipelineConfig::default());
    let (summary, _) = skip.process_recording("sparse", &raw).unwrap();
    let row = summary.row(ClusterId::new(1)).unwrap();
    assert_relative_eq!(row.cv_isi, 0.0, epsilon = 1e-12);
    assert_relative_eq!(row.firing_rate, scaled(1.0 / 90.0), max_relative = 1e-9);

    let propagate = RecordingStatsPipeline::new(
        PipelineConfig::default().with_median_policy(MedianPolicy::Propagate),
    );
    let (summary, _) = propagate.process_recording("sparse", &raw).unwrap();
    let row = summary.row(ClusterId::new(1)).unwrap();
    assert!(row.cv_isi.is_nan());
    // Every bin holds a spike, so no firing rate bin is undefined.
    assert_relative_eq!(row.firing_rate, scaled(1.0 / 90.0), max_relative = 1e-9);
}
