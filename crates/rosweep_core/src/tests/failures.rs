//! Tests for failure isolation and recovery
//!
//! These tests verify:
//! - A failed combination never stops the remaining ones
//! - Reinitialize policies and the single retry after a failure
//! - Configuration errors surface before any solve
//! - Cancellation stops the sweep

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{TestModel, linear, optimize, out, reinitialize};
use crate::error::{ConfigError, SolveError, SweepError};
use crate::model::{Reinitialize, SolveOptions, SolveStatus};
use crate::sweep::{
    OutputSpec, ReinitializePolicy, SweepConfig, SweepDriver, SweepProgress, parameter_sweep,
};

fn reinit() -> Option<&'static dyn Reinitialize<TestModel>> {
    Some(&reinitialize)
}

#[test]
fn test_failed_rows_do_not_stop_the_sweep() {
    // x = -1.0, -0.5, 0.0, 0.5, 1.0; negative x is infeasible
    let config = SweepConfig::new(vec![linear("x", -1.0, 1.0, 5)], out()).workers(2);

    let outcome = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();

    assert_eq!(outcome.table.len(), 5);
    assert_eq!(
        outcome.table.solve_successful(),
        vec![false, false, true, true, true]
    );
    assert!(
        outcome.table.rows[0]
            .failure_reason()
            .unwrap()
            .contains("infeasible")
    );

    let results = outcome.global_results.unwrap();
    assert!(results["out"][0].is_nan());
    assert!(results["out"][1].is_nan());
    assert_eq!(&results["out"][2..], &[0.0, 0.5, 1.0]);
}

#[test]
fn test_all_failed_has_no_global_results() {
    let config = SweepConfig::new(vec![linear("x", -3.0, -1.0, 3)], out());

    let outcome = parameter_sweep(&TestModel::new(), config, &optimize, None).unwrap();

    assert_eq!(outcome.table.failure_count(), 3);
    assert!(outcome.global_results.is_none());
}

#[test]
fn test_retry_after_reinitialize_on_failure() {
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 4)], out())
        .reinitialize(ReinitializePolicy::OnFailure);
    let driver = SweepDriver::new(config);

    let outcome = driver
        .parameter_sweep(&TestModel::needing_init(), &optimize, reinit(), None)
        .unwrap();

    assert_eq!(outcome.table.success_count(), 4);
}

#[test]
fn test_on_failure_without_callback_keeps_failure() {
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 4)], out());

    let outcome = parameter_sweep(&TestModel::needing_init(), config, &optimize, None).unwrap();

    assert_eq!(outcome.table.failure_count(), 4);
    assert!(
        outcome.table.rows[0]
            .failure_reason()
            .unwrap()
            .contains("not initialized")
    );
}

#[test]
fn test_never_policy_skips_reinitialize() {
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 3)], out())
        .reinitialize(ReinitializePolicy::Never);

    let outcome = SweepDriver::new(config)
        .parameter_sweep(&TestModel::needing_init(), &optimize, reinit(), None)
        .unwrap();

    assert_eq!(outcome.table.failure_count(), 3);
}

#[test]
fn test_before_each_solve_policy() {
    let calls = AtomicUsize::new(0);
    let counting = |model: &mut TestModel, options: &SolveOptions| {
        calls.fetch_add(1, Ordering::Relaxed);
        reinitialize(model, options)
    };
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 6)], out())
        .reinitialize(ReinitializePolicy::BeforeEachSolve)
        .workers(3);

    let outcome = SweepDriver::new(config)
        .parameter_sweep(&TestModel::needing_init(), &optimize, Some(&counting), None)
        .unwrap();

    assert_eq!(outcome.table.success_count(), 6);
    assert_eq!(calls.load(Ordering::Relaxed), 6);
}

#[test]
fn test_failing_reinitialize_marks_row_failed() {
    let broken = |_: &mut TestModel, _: &SolveOptions| -> Result<(), SolveError> {
        Err(SolveError::Evaluation("initialization diverged".into()))
    };
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 2)], out())
        .reinitialize(ReinitializePolicy::BeforeEachSolve);

    let outcome = SweepDriver::new(config)
        .parameter_sweep(&TestModel::new(), &optimize, Some(&broken), None)
        .unwrap();

    assert_eq!(outcome.table.failure_count(), 2);
    assert!(
        outcome.table.rows[1]
            .failure_reason()
            .unwrap()
            .contains("initialization diverged")
    );
}

#[test]
fn test_unknown_output_fails_before_any_solve() {
    let solves = AtomicUsize::new(0);
    let counting = |model: &mut TestModel, options: &SolveOptions| {
        solves.fetch_add(1, Ordering::Relaxed);
        optimize(model, options)
    };
    let config = SweepConfig::new(
        vec![linear("x", 0.0, 1.0, 3)],
        vec![OutputSpec::new("LCOW", "fs.costing.LCOW")],
    );

    let err = SweepDriver::new(config)
        .parameter_sweep(&TestModel::new(), &counting, None, None)
        .unwrap_err();

    assert!(matches!(
        err,
        SweepError::Config(ConfigError::UnresolvedQuantity { ref quantity, .. })
            if quantity == "fs.costing.LCOW"
    ));
    assert_eq!(solves.load(Ordering::Relaxed), 0);
}

#[test]
fn test_non_optimal_status_is_failure() {
    let capped = |_: &mut TestModel, _: &SolveOptions| -> Result<SolveStatus, SolveError> {
        Ok(SolveStatus::MaxIterations)
    };
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 2)], out())
        .reinitialize(ReinitializePolicy::Never);

    let outcome = SweepDriver::new(config)
        .parameter_sweep(&TestModel::new(), &capped, None, None)
        .unwrap();

    assert_eq!(outcome.table.failure_count(), 2);
    assert!(
        outcome.table.rows[0]
            .failure_reason()
            .unwrap()
            .contains("maximum iterations")
    );
}

#[test]
fn test_cancelled_sweep() {
    let progress = SweepProgress::default();
    progress.cancel();
    let config = SweepConfig::new(vec![linear("x", 0.0, 1.0, 10)], out());

    let err = SweepDriver::new(config)
        .parameter_sweep(&TestModel::new(), &optimize, None, Some(&progress))
        .unwrap_err();

    assert!(matches!(err, SweepError::Cancelled));
}

#[test]
fn test_progress_counts_rows() {
    let progress = SweepProgress::default();
    let config = SweepConfig::new(vec![linear("x", -1.0, 1.0, 5)], out()).workers(2);

    SweepDriver::new(config)
        .parameter_sweep(&TestModel::new(), &optimize, None, Some(&progress))
        .unwrap();

    assert_eq!(progress.total(), 5);
    assert_eq!(progress.completed(), 5);
    assert_eq!(progress.failed(), 2);
}
