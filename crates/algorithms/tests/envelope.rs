//! Integration tests for Monte-Carlo envelopes

mod common;

use common::{clustered_pattern, uniform_pattern, SIDE};
use markcorr_algorithms::distance::{CoordinateDistances, TableDistances};
use markcorr_algorithms::statistics::{
    simulate_envelope, simulate_envelope_with_progress, EnvelopeKind, EnvelopeParams, MParams, NullModel,
};
use markcorr_core::{Error, RadiusSequence, TabulatedPattern};
use markcorr_parallel::{CancelToken, ProcessingMode};

fn radii() -> RadiusSequence {
    RadiusSequence::linear(15.0, 15).unwrap()
}

fn params(kind: EnvelopeKind) -> EnvelopeParams {
    EnvelopeParams {
        kind,
        simulations: 99,
        seed: 7,
        batch_size: 10,
        ..EnvelopeParams::default()
    }
}

#[test]
fn global_envelope_is_wider_than_pointwise() {
    let points = clustered_pattern(8, 20, 4.0, 300, 1);
    let provider = CoordinateDistances::new(&points);
    let m_params = MParams::default();

    for null_model in [
        NullModel::RandomLabeling,
        NullModel::RandomLocation,
        NullModel::PopulationIndependence,
    ] {
        let pointwise = simulate_envelope(
            &provider,
            points.marks(),
            &radii(),
            &m_params,
            &EnvelopeParams {
                null_model,
                ..params(EnvelopeKind::Pointwise)
            },
        )
        .unwrap();
        let global = simulate_envelope(
            &provider,
            points.marks(),
            &radii(),
            &m_params,
            &EnvelopeParams {
                null_model,
                ..params(EnvelopeKind::Global)
            },
        )
        .unwrap();

        assert!(global.critical_deviation.is_some());
        assert_eq!(pointwise.observed, global.observed);
        for k in 0..radii().len() {
            if let (Some(pw), Some(gw)) = (pointwise.width(k), global.width(k)) {
                assert!(gw >= pw, "{null_model:?} radius {}: global {gw} < pointwise {pw}", radii()[k]);
            }
        }
    }
}

#[test]
fn pointwise_bounds_bracket_random_pattern() {
    let points = uniform_pattern(400, SIDE, 0.5, 17);
    let provider = CoordinateDistances::new(&points);
    let envelope = simulate_envelope(
        &provider,
        points.marks(),
        &radii(),
        &MParams::default(),
        &params(EnvelopeKind::Pointwise),
    )
    .unwrap();

    for record in envelope.records() {
        if let (Some(lo), Some(hi)) = (record.lower, record.upper) {
            assert!(lo <= hi);
            assert!(lo <= 1.0 + 1e-9 || record.radius < 2.0, "r = {}: lower {lo}", record.radius);
        }
    }
    assert_eq!(envelope.simulations_completed, 99);
}

#[test]
fn envelope_independent_of_thread_count() {
    let points = uniform_pattern(300, SIDE, 0.4, 23);
    let provider = CoordinateDistances::new(&points);
    let m_params = MParams::default();

    let run = |mode: ProcessingMode, batch_size: usize| {
        simulate_envelope(
            &provider,
            points.marks(),
            &radii(),
            &m_params,
            &EnvelopeParams {
                mode,
                batch_size,
                ..params(EnvelopeKind::Global)
            },
        )
        .unwrap()
    };

    let reference = run(ProcessingMode::Sequential, 99);
    for (mode, batch_size) in [
        (ProcessingMode::ParallelWith(2), 10),
        (ProcessingMode::ParallelWith(4), 7),
        (ProcessingMode::Parallel, 1),
    ] {
        let other = run(mode, batch_size);
        assert_eq!(other.lower, reference.lower, "{mode:?}");
        assert_eq!(other.upper, reference.upper, "{mode:?}");
        assert_eq!(other.critical_deviation, reference.critical_deviation);
    }
}

#[test]
fn different_seeds_give_different_envelopes() {
    let points = uniform_pattern(300, SIDE, 0.4, 23);
    let provider = CoordinateDistances::new(&points);
    let a = simulate_envelope(&provider, points.marks(), &radii(), &MParams::default(), &params(EnvelopeKind::Pointwise)).unwrap();
    let b = simulate_envelope(
        &provider,
        points.marks(),
        &radii(),
        &MParams::default(),
        &EnvelopeParams {
            seed: 8,
            ..params(EnvelopeKind::Pointwise)
        },
    )
    .unwrap();
    assert_ne!(a.upper, b.upper);
}

#[test]
fn table_and_coordinates_give_same_envelope() {
    let points = clustered_pattern(5, 20, 3.0, 150, 9);
    let tabulated = TabulatedPattern::from_points(&points);
    let m_params = MParams::new("Case", "Control");

    let by_coords = simulate_envelope(
        &CoordinateDistances::new(&points),
        points.marks(),
        &radii(),
        &m_params,
        &params(EnvelopeKind::Global),
    )
    .unwrap();
    let by_table = simulate_envelope(
        &TableDistances::new(tabulated.table()),
        tabulated.marks(),
        &radii(),
        &m_params,
        &params(EnvelopeKind::Global),
    )
    .unwrap();
    assert_eq!(by_coords.lower, by_table.lower);
    assert_eq!(by_coords.upper, by_table.upper);
}

#[test]
fn cancellation_returns_partial_envelope() {
    let points = uniform_pattern(200, SIDE, 0.5, 31);
    let provider = CoordinateDistances::new(&points);
    let token = CancelToken::new();
    let params = EnvelopeParams {
        simulations: 50,
        batch_size: 10,
        cancel: Some(token.clone()),
        ..EnvelopeParams::default()
    };

    let envelope = simulate_envelope_with_progress(
        &provider,
        points.marks(),
        &radii(),
        &MParams::default(),
        &params,
        |done, _| {
            if done >= 20 {
                token.cancel();
            }
        },
    )
    .unwrap();

    assert!(envelope.is_partial());
    assert_eq!(envelope.simulations_completed, 20);
    assert_eq!(envelope.simulations_requested, 50);
    assert!(envelope.lower.iter().any(Option::is_some));
}

#[test]
fn missing_type_fails_before_simulating() {
    let points = uniform_pattern(50, SIDE, 0.5, 2);
    let provider = CoordinateDistances::new(&points);
    let err = simulate_envelope(
        &provider,
        points.marks(),
        &radii(),
        &MParams::new("Case", "Shop"),
        &params(EnvelopeKind::Pointwise),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingType(ref t) if t == "Shop"));
}

#[test]
fn envelope_serializes_as_records() {
    let points = uniform_pattern(80, SIDE, 0.5, 4);
    let provider = CoordinateDistances::new(&points);
    let envelope = simulate_envelope(
        &provider,
        points.marks(),
        &radii(),
        &MParams::default(),
        &EnvelopeParams {
            simulations: 9,
            ..params(EnvelopeKind::Global)
        },
    )
    .unwrap();

    let json = serde_json::to_value(envelope.records()).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), radii().len());
    assert!(rows[0].get("lower").is_some());

    let full = serde_json::to_value(&envelope).unwrap();
    assert_eq!(full["kind"], "global");
    assert_eq!(full["null_model"], "random-labeling");
}
