//! Tests for result files written by a sweep
//!
//! These tests verify:
//! - CSV and archive files reproduce the in-memory table
//! - Parent directories are created on demand
//! - A write failure still hands back the finished results

use super::{TestModel, linear, optimize, out, uniform};
use crate::error::SweepError;
use crate::io::{SUCCESS_COLUMN, read_archive, read_csv};
use crate::sweep::{SweepConfig, parameter_sweep};

#[test]
fn test_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output").join("results.csv");
    let config = SweepConfig::new(vec![uniform("x", -1.0, 1.0), uniform("y", 0.0, 1e-11)], out())
        .num_samples(12)
        .seed(5)
        .csv_path(&path);

    let outcome = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();
    let table = read_csv(&path, 2).unwrap();

    assert_eq!(table.input_names, vec!["x", "y"]);
    assert_eq!(table.output_names, vec!["out"]);
    assert_eq!(table.len(), outcome.table.len());
    assert_eq!(table.solve_successful(), outcome.table.solve_successful());
    for (read, original) in table.rows.iter().zip(&outcome.table.rows) {
        assert_eq!(read.inputs, original.inputs);
        assert_eq!(read.outputs(), original.outputs());
    }
}

#[test]
fn test_csv_header_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let config = SweepConfig::new(vec![linear("x", -1.0, 1.0, 3)], out()).csv_path(&path);

    parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some(format!("x,out,{SUCCESS_COLUMN}").as_str()));
    assert_eq!(lines.next(), Some("-1.0,nan,0"));
    assert_eq!(lines.next(), Some("0.0,0.0,1"));
    assert_eq!(lines.next(), Some("1.0,1.0,1"));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_archive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("results_simple_test_4.bin");
    let config = SweepConfig::new(vec![linear("x", -1.0, 2.0, 4)], out())
        .seed(17)
        .archive_path(&path);

    let before = jiff::Timestamp::now();
    let outcome = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();
    let archive = read_archive(&path).unwrap();

    assert!(archive.created >= before && archive.created <= jiff::Timestamp::now());
    assert_eq!(archive.seed, 17);
    assert_eq!(archive.len(), 4);
    assert_eq!(archive.solve_successful, vec![false, true, true, true]);
    assert!(archive.failure_reasons[&0].contains("infeasible"));
    assert_eq!(archive.to_table().unwrap(), outcome.table);
}

#[test]
fn test_write_failure_keeps_results() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the output directory should be
    let blocker = dir.path().join("output");
    std::fs::write(&blocker, "not a directory").unwrap();
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 3)], out())
        .csv_path(blocker.join("results.csv"));

    let err = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap_err();

    assert!(matches!(err, SweepError::Persist { .. }));
    let outcome = err.into_outcome().unwrap();
    assert_eq!(outcome.table.success_count(), 3);
    assert_eq!(outcome.global_results.unwrap()["out"], vec![0.0, 0.5, 1.0]);
}

#[test]
fn test_timings_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 50)], out())
        .csv_path(dir.path().join("results.csv"));

    let outcome = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();

    let timings = outcome.timings;
    assert_eq!(
        timings.total(),
        timings.building_combinations
            + timings.sweep_solves
            + timings.gathering_results
            + timings.writing_files
    );
    assert!(timings.writing_files > std::time::Duration::ZERO);
}
