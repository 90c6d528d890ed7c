//! Integration tests for the M function and the grid approximation

mod common;

use common::{clustered_pattern, lattice_pattern, uniform_pattern, SIDE};
use markcorr_algorithms::approximation::grid_approximation;
use markcorr_algorithms::distance::{CoordinateDistances, DistanceMode, TableDistances};
use markcorr_algorithms::statistics::{m_function, m_function_for, MParams, Normalization};
use markcorr_core::{Error, Marks, RadiusSequence, TabulatedPattern};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn radii() -> RadiusSequence {
    RadiusSequence::linear(20.0, 20).unwrap()
}

// ---------------------------------------------------------------------------
// Representation equivalence
// ---------------------------------------------------------------------------

#[test]
fn coordinate_and_table_providers_agree() {
    let points = clustered_pattern(8, 25, 4.0, 300, 11);
    let params = MParams::default();

    let by_coords = m_function_for(&points, DistanceMode::Coordinates, &radii(), &params).unwrap();
    let by_table = m_function_for(&points, DistanceMode::Table, &radii(), &params).unwrap();
    let unindexed = m_function(&CoordinateDistances::unindexed(&points), points.marks(), &radii(), &params).unwrap();

    assert_eq!(by_coords.values, by_table.values);
    assert_eq!(by_coords.values, unindexed.values);
}

#[test]
fn tabulated_pattern_matches_located_pattern() {
    let points = uniform_pattern(400, SIDE, 0.3, 5);
    let tabulated = TabulatedPattern::from_points(&points);
    let params = MParams {
        normalization: Normalization::ExcludeSelf,
        ..MParams::default()
    };

    let from_table = m_function(
        &TableDistances::new(tabulated.table()),
        tabulated.marks(),
        &radii(),
        &params,
    )
    .unwrap();
    let from_coords = m_function_for(&points, DistanceMode::Coordinates, &radii(), &params).unwrap();

    let diff = from_table.max_abs_difference(&from_coords).unwrap().unwrap();
    assert!(diff <= 1e-12, "max difference {diff}");
}

#[test]
fn thread_count_does_not_change_values() {
    let points = uniform_pattern(1500, SIDE, 0.5, 3);
    let params = MParams::default();
    let expected = m_function_for(&points, DistanceMode::Coordinates, &radii(), &params).unwrap();

    for threads in [1, 2, 5] {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        let got = pool.install(|| m_function_for(&points, DistanceMode::Coordinates, &radii(), &params).unwrap());
        assert_eq!(got.values, expected.values, "{threads} threads");
    }
}

// ---------------------------------------------------------------------------
// Behavior of M
// ---------------------------------------------------------------------------

#[test]
fn undefined_below_nearest_neighbor_distance() {
    let points = lattice_pattern(10);
    let radii = RadiusSequence::new(vec![0.0, 0.5, 0.99, 1.0, 3.0]).unwrap();

    for mode in [DistanceMode::Coordinates, DistanceMode::Table] {
        let m = m_function_for(&points, mode, &radii, &MParams::default()).unwrap();
        assert!(m.values[..3].iter().all(Option::is_none));
        assert!(m.values[3].is_some());
        assert!(m.values[4].unwrap().is_finite());
        assert!(matches!(m.value_at(1), Err(Error::EmptyNeighborhood { .. })));
    }
}

#[test]
fn clustered_cases_attract_cases() {
    let points = clustered_pattern(6, 30, 3.0, 400, 21);
    let m = m_function_for(
        &points,
        DistanceMode::Coordinates,
        &RadiusSequence::new(vec![1.0, 3.0, 6.0]).unwrap(),
        &MParams::new("Case", "Case"),
    )
    .unwrap();
    for v in m.values.iter().flatten() {
        assert!(*v > 1.5, "self-concentration {v}");
    }
}

#[test]
fn values_are_non_negative() {
    let points = uniform_pattern(500, SIDE, 0.2, 8);
    let m = m_function_for(&points, DistanceMode::Coordinates, &radii(), &MParams::default()).unwrap();
    assert!(m.values.iter().flatten().all(|v| *v >= 0.0));
}

#[test]
fn mean_over_random_labelings_converges_to_one() {
    let base = uniform_pattern(1000, SIDE, 0.5, 99);
    let provider = CoordinateDistances::new(&base);
    let radii = RadiusSequence::new(vec![2.5, 5.0, 10.0, 20.0]).unwrap();
    let params = MParams::default();
    let draws = 500;

    let mut rng = StdRng::seed_from_u64(2024);
    let mut sums = vec![0.0; radii.len()];
    let mut counts = vec![0usize; radii.len()];
    for _ in 0..draws {
        let labels: Vec<(&str, f64)> = base
            .marks()
            .weights()
            .iter()
            .map(|&w| (if rng.random_bool(0.5) { "Case" } else { "Control" }, w))
            .collect();
        let marks = Marks::new(labels).unwrap();
        if marks.require("Case").is_err() || marks.require("Control").is_err() {
            continue;
        }
        let m = m_function(&provider, &marks, &radii, &params).unwrap();
        for (k, v) in m.values.iter().enumerate() {
            if let Some(v) = v {
                sums[k] += v;
                counts[k] += 1;
            }
        }
    }

    for k in 0..radii.len() {
        let mean = sums[k] / counts[k] as f64;
        assert!((mean - 1.0).abs() < 0.05, "r = {}: mean M = {mean}", radii[k]);
    }
}

// ---------------------------------------------------------------------------
// Grid approximation
// ---------------------------------------------------------------------------

#[test]
fn grid_conserves_weight_per_type() {
    let points = clustered_pattern(10, 40, 5.0, 1000, 4);
    for partitions in [1, 4, 16, 64, 256] {
        let grid = grid_approximation(&points, partitions).unwrap();
        assert!(grid.len() <= 2 * partitions * partitions);
        assert!(grid.len() <= points.len());

        for (before, after) in points.summary().types.iter().zip(grid.summary().types.iter()) {
            assert_eq!(before.label, after.label);
            let tol = 1e-9 * before.weight;
            assert!((before.weight - after.weight).abs() <= tol, "{}", before.label);
        }
    }
}

#[test]
fn fine_grid_approximates_m() {
    let points = clustered_pattern(10, 40, 5.0, 1000, 4);
    let radii = RadiusSequence::new(vec![5.0, 10.0, 20.0]).unwrap();
    let params = MParams::default();

    let exact = m_function_for(&points, DistanceMode::Coordinates, &radii, &params).unwrap();
    let grid = grid_approximation(&points, 200).unwrap();
    let approx = m_function_for(&grid, DistanceMode::Coordinates, &radii, &params).unwrap();

    let diff = exact.max_abs_difference(&approx).unwrap().unwrap();
    assert!(diff < 0.1, "approximation error {diff}");
}

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// Fits `t = t0 · (n / n0)^p` to wall-clock timings; `p` must stay well
/// below the quadratic worst case. Run with `cargo test --release -- --ignored`.
#[test]
#[ignore]
fn m_function_scales_sub_quadratically() {
    let side = 1000.0;
    let radii = RadiusSequence::linear(10.0, 32).unwrap();
    let params = MParams::default();

    let mut samples = Vec::new();
    for n in [1_000, 5_000, 10_000, 50_000, 100_000] {
        let points = uniform_pattern(n, side, 0.5, n as u64);
        let start = std::time::Instant::now();
        m_function_for(&points, DistanceMode::Coordinates, &radii, &params).unwrap();
        let secs = start.elapsed().as_secs_f64().max(1e-9);
        samples.push(((n as f64).ln(), secs.ln()));
    }

    let count = samples.len() as f64;
    let mean_x = samples.iter().map(|s| s.0).sum::<f64>() / count;
    let mean_y = samples.iter().map(|s| s.1).sum::<f64>() / count;
    let cov: f64 = samples.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let var: f64 = samples.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let exponent = cov / var;

    eprintln!("fitted exponent p = {exponent:.3}");
    assert!(exponent < 1.8, "p = {exponent}");
}
