//! Tests for reproducible combination sets
//!
//! These tests verify:
//! - Fixed grids are enumerated in row-major order, last parameter fastest
//! - Seeded random sweeps reproduce their rows and outputs
//! - A sweep without a seed reports the one it drew

use super::{TestModel, linear, optimize, out, uniform};
use crate::sweep::{SamplingKind, SweepConfig, SweepDriver, parameter_sweep};
use crate::{ParameterSpec, SamplingCategory};

#[test]
fn test_fixed_grid_is_row_major() {
    let config = SweepConfig::new(
        vec![linear("x", 0.0, 2.0, 3), linear("y", 0.0, 1.0, 2)],
        out(),
    )
    .workers(2);

    let outcome = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();

    let inputs: Vec<Vec<f64>> = outcome.table.rows.iter().map(|r| r.inputs.clone()).collect();
    assert_eq!(
        inputs,
        vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 0.0],
            vec![2.0, 1.0],
        ]
    );
    let results = outcome.global_results.unwrap();
    assert_eq!(results["out"], vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0]);
}

#[test]
fn test_fixed_grid_ignores_num_samples() {
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 4)], out()).num_samples(100);
    let driver = SweepDriver::new(config);

    let combinations = driver.build_combinations(&TestModel::new(), 1).unwrap();

    assert_eq!(combinations.len(), 4);
    assert_eq!(combinations.shape, Some(vec![4]));
}

#[test]
fn test_seeded_random_sweep_reproduces() {
    let config = SweepConfig::new(vec![uniform("x", 0.0, 1.0), uniform("y", -1.0, 1.0)], out())
        .num_samples(25)
        .seed(1234)
        .workers(3);

    let first = parameter_sweep(&TestModel::new(), config.clone(), &optimize, None).unwrap();
    let second = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();

    assert_eq!(first.seed, 1234);
    assert_eq!(first.table.len(), 25);
    assert_eq!(first.table, second.table);
    for row in &first.table.rows {
        assert!((0.0..=1.0).contains(&row.inputs[0]));
        assert!((-1.0..=1.0).contains(&row.inputs[1]));
    }
}

#[test]
fn test_different_seeds_differ() {
    let config = SweepConfig::new(vec![uniform("x", 0.0, 1.0)], out()).num_samples(10);
    let driver = SweepDriver::new(config);
    let model = TestModel::new();

    let a = driver.build_combinations(&model, 1).unwrap();
    let b = driver.build_combinations(&model, 2).unwrap();

    assert_ne!(a.rows, b.rows);
}

#[test]
fn test_drawn_seed_is_reported() {
    let config = SweepConfig::new(vec![uniform("x", 0.0, 1.0)], out()).num_samples(8);

    let first = parameter_sweep(&TestModel::new(), config.clone(), &optimize, None).unwrap();
    let replay = parameter_sweep(
        &TestModel::new(),
        config.seed(first.seed),
        &optimize,
        None,
    )
    .unwrap();

    assert_eq!(first.table, replay.table);
}

#[test]
fn test_latin_hypercube_rows() {
    let lhs = |name: &str| {
        ParameterSpec::new(
            name,
            format!("fs.{name}"),
            SamplingKind::LatinHypercube {
                lower: 0.0,
                upper: 1.0,
            },
        )
    };
    let config = SweepConfig::new(vec![lhs("x"), lhs("y")], out())
        .num_samples(10)
        .seed(7);
    assert_eq!(config.validate(), Ok(SamplingCategory::LatinHypercube));

    let outcome = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();

    assert_eq!(outcome.table.len(), 10);
    assert_eq!(outcome.table.success_count(), 10);
    let mut strata: Vec<usize> = outcome
        .table
        .column("x")
        .unwrap()
        .iter()
        .map(|v| ((v * 10.0).floor() as usize).min(9))
        .collect();
    strata.sort_unstable();
    assert_eq!(strata, (0..10).collect::<Vec<_>>());
}
