//! Rolling history and feature vector tests

use hive_node::config::{EPSILON, HISTORY_LEN};
use hive_node::dsp::SpectrumSummary;
use hive_node::features::{SUMMER_VECTOR_LEN, WINTER_VECTOR_LEN};
use hive_node::{FeatureAssembler, RollingHistory};

fn summary_with(density: f32, bins: [f32; 20]) -> SpectrumSummary {
    SpectrumSummary {
        density,
        bins,
        windows: 187,
    }
}

#[test]
fn test_rolling_average_matches_mean_before_full() {
    let mut h = RollingHistory::<12>::new();
    h.push(1.0);
    h.push(2.0);
    h.push(6.0);
    assert!((h.mean().unwrap() - 3.0).abs() < 1e-6);
}

#[test]
fn test_fifo_eviction_after_capacity() {
    let mut h = RollingHistory::<HISTORY_LEN>::new();
    for i in 0..15 {
        h.push(i as f32);
    }
    // 15 inserts with H=12: only 3..=14 remain.
    assert_eq!(h.len(), 12);
    let expected: Vec<f32> = (3..15).map(|i| i as f32).collect();
    assert_eq!(h.iter().collect::<Vec<_>>(), expected);
    let mean = (3..15).sum::<i32>() as f32 / 12.0;
    assert!((h.mean().unwrap() - mean).abs() < 1e-5);
}

#[test]
fn test_cold_start_spike_ratio_is_one() {
    let fa = FeatureAssembler::new();
    for probe in [0.001_f32, 0.5, 123.0] {
        let ratio = fa.spike_ratio(probe);
        assert!(
            (ratio - 1.0).abs() < 1e-3,
            "cold-start ratio for {probe} was {ratio}"
        );
    }
}

#[test]
fn test_spike_ratio_over_warm_history() {
    let mut fa = FeatureAssembler::new();
    for _ in 0..5 {
        fa.record_density(0.1);
    }
    let ratio = fa.spike_ratio(0.3);
    assert!(
        (ratio - 0.3 / (0.1 + EPSILON)).abs() < 1e-3,
        "ratio was {ratio}"
    );
}

#[test]
fn test_summer_vector_shape_and_layout() {
    let mut fa = FeatureAssembler::new();
    let mut bins = [0.0_f32; 20];
    for (k, b) in bins.iter_mut().enumerate() {
        *b = k as f32;
    }
    let v = fa.build_summer(33.5, 60.0, 14.0, &summary_with(0.2, bins));

    assert_eq!(v.len(), SUMMER_VECTOR_LEN);
    assert_eq!(v[0], 33.5);
    assert_eq!(v[1], 60.0);
    assert_eq!(v[2], 14.0);
    // bins 0..4 are excluded; slot 4 carries bin 4.
    assert_eq!(v[4], 4.0);
    assert_eq!(v[19], 19.0);
}

#[test]
fn test_summer_vector_records_density() {
    let mut fa = FeatureAssembler::new();
    assert_eq!(fa.density_count(), 0);
    fa.build_summer(25.0, 50.0, 14.0, &summary_with(0.2, [0.0; 20]));
    assert_eq!(fa.density_count(), 1);
    // The new observation is in the average, so a steady signal holds 1.0.
    let v = fa.build_summer(25.0, 50.0, 14.0, &summary_with(0.2, [0.0; 20]));
    assert!((v[3] - 1.0).abs() < 1e-3);
}

#[test]
fn test_winter_vector_shape_and_heater_features() {
    let mut fa = FeatureAssembler::new();
    let mut bins = [0.0_f32; 20];
    bins[6] = 1.0;
    bins[7] = 2.0;
    bins[8] = 4.0;
    bins[9] = 100.0; // not a heater bin
    let v = fa.build_winter(10.0, 80.0, &summary_with(0.5, bins));

    assert_eq!(v.len(), WINTER_VECTOR_LEN);
    assert_eq!(v[0], 10.0);
    assert_eq!(v[1], 80.0);
    assert_eq!(v[2], 0.0, "one temperature sample has no variance");
    assert!((v[3] - 7.0).abs() < 1e-6);
    assert!((v[4] - 7.0 / (0.5 + EPSILON)).abs() < 1e-3);
}

#[test]
fn test_winter_temperature_variance_builds_up() {
    let mut fa = FeatureAssembler::new();
    let summary = summary_with(0.1, [0.0; 20]);
    fa.build_winter(10.0, 50.0, &summary);
    let v = fa.build_winter(14.0, 50.0, &summary);
    // Population variance of {10, 14} is 4.
    assert!((v[2] - 4.0).abs() < 1e-5);
}

#[test]
fn test_clear_empties_both_histories() {
    let mut fa = FeatureAssembler::new();
    let summary = summary_with(0.1, [0.0; 20]);
    fa.build_summer(25.0, 50.0, 14.0, &summary);
    fa.build_winter(25.0, 50.0, &summary);
    assert_eq!(fa.density_count(), 1);
    assert_eq!(fa.temperature_count(), 1);

    fa.clear();
    assert_eq!(fa.density_count(), 0);
    assert_eq!(fa.temperature_count(), 0);
    assert!((fa.spike_ratio(0.7) - 1.0).abs() < 1e-3);
}
