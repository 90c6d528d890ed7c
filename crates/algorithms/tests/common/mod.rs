//! Seeded pattern generators shared by the integration tests

#![allow(dead_code)]

use markcorr_core::{Point, PointSet, Window};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SIDE: f64 = 100.0;

pub fn square_window(side: f64) -> Window {
    Window::rectangle(0.0, side, 0.0, side).unwrap()
}

/// `n` uniform points in a `side × side` square; each point is "Case" with
/// probability `case_share`, otherwise "Control", with weights in [1, 10).
pub fn uniform_pattern(n: usize, side: f64, case_share: f64, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let points: Vec<Point> = (0..n)
        .map(|i| {
            let x = rng.random_range(0.0..side);
            let y = rng.random_range(0.0..side);
            // Guarantee both types whatever the draws
            let label = match i {
                0 => "Case",
                1 => "Control",
                _ if rng.random_bool(case_share) => "Case",
                _ => "Control",
            };
            Point::new(x, y, label, rng.random_range(1.0..10.0))
        })
        .collect();
    PointSet::new(square_window(side), points).unwrap()
}

/// Matérn-like clusters of "Case" points around random parents, over a
/// uniform background of "Control" points.
pub fn clustered_pattern(parents: usize, per_parent: usize, spread: f64, controls: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(parents * per_parent + controls);

    for _ in 0..parents {
        let px = rng.random_range(spread..SIDE - spread);
        let py = rng.random_range(spread..SIDE - spread);
        for _ in 0..per_parent {
            let angle = rng.random_range(0.0..std::f64::consts::TAU);
            let dist = spread * rng.random::<f64>().sqrt();
            points.push(Point::new(
                px + dist * angle.cos(),
                py + dist * angle.sin(),
                "Case",
                rng.random_range(1.0..5.0),
            ));
        }
    }
    for _ in 0..controls {
        points.push(Point::new(
            rng.random_range(0.0..SIDE),
            rng.random_range(0.0..SIDE),
            "Control",
            rng.random_range(1.0..5.0),
        ));
    }
    PointSet::new(square_window(SIDE), points).unwrap()
}

/// Points on a regular lattice with unit spacing, alternating types.
pub fn lattice_pattern(side: usize) -> PointSet {
    let points: Vec<Point> = (0..side * side)
        .map(|k| {
            let (x, y) = ((k % side) as f64, (k / side) as f64);
            let label = if k % 2 == 0 { "Case" } else { "Control" };
            Point::new(x, y, label, 1.0 + (k % 3) as f64)
        })
        .collect();
    PointSet::new(square_window(side as f64), points).unwrap()
}
