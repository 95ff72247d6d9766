//! Sweep execution: combinations in, result table out.
//!
//! A sweep runs in four timed phases:
//! 1. **Build**: validate the config against the model, draw the combination set
//! 2. **Solve**: each rank assigns, reinitializes, optimizes and reads back its partition
//! 3. **Gather**: rows are merged on the root rank in combination-index order
//! 4. **Write**: optional CSV and binary archive
//!
//! A failed combination never aborts the sweep. Configuration problems abort
//! before the first solve.

use std::time::Instant;

use crate::error::SweepError;
use crate::io::{self, ResultArchive};
use crate::model::{Model, Optimize, Reinitialize, SolveOptions};
use crate::parallel::ParallelManager;
use crate::results::{ResultRow, ResultTable, RowOutcome, SweepOutcome, SweepTimings};

use super::combinations::resolve_seed;
use super::{Combinations, ReinitializePolicy, SweepConfig, SweepProgress};

/// Drives one parameter sweep over a caller-owned model
#[derive(Debug, Clone)]
pub struct SweepDriver {
    config: SweepConfig,
}

impl SweepDriver {
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn parallel_manager(&self) -> ParallelManager {
        ParallelManager::new(self.config.workers)
    }

    /// Validate against the model and draw the combination set, without solving.
    pub fn build_combinations<M: Model>(
        &self,
        model: &M,
        seed: u64,
    ) -> Result<Combinations, SweepError> {
        self.config.validate()?;
        self.config.resolve(model)?;
        Ok(Combinations::build(&self.config, seed)?)
    }

    /// Run the sweep and write any configured result files.
    ///
    /// If the sweep completes but a file cannot be written, the error is
    /// [`SweepError::Persist`] and still carries the in-memory outcome.
    pub fn parameter_sweep<M: Model>(
        &self,
        model: &M,
        optimize: &dyn Optimize<M>,
        reinitialize: Option<&dyn Reinitialize<M>>,
        progress: Option<&SweepProgress>,
    ) -> Result<SweepOutcome, SweepError> {
        let mut timings = SweepTimings::default();

        let start = Instant::now();
        let seed = resolve_seed(self.config.seed);
        let combinations = self.build_combinations(model, seed)?;
        timings.building_combinations = start.elapsed();

        tracing::info!(
            combinations = combinations.len(),
            parameters = self.config.ndim(),
            workers = self.config.workers,
            seed,
            "starting parameter sweep"
        );

        if let Some(p) = progress {
            p.reset(combinations.len());
        }
        let table = self.evaluate(
            model,
            &combinations,
            optimize,
            reinitialize,
            progress,
            &mut timings,
        )?;

        let outcome = SweepOutcome {
            global_results: table.output_arrays(),
            table,
            seed,
            timings,
        };
        self.write_outputs(outcome)
    }

    /// Solve every combination and gather the rows in index order.
    pub(crate) fn evaluate<M: Model>(
        &self,
        model: &M,
        combinations: &Combinations,
        optimize: &dyn Optimize<M>,
        reinitialize: Option<&dyn Reinitialize<M>>,
        progress: Option<&SweepProgress>,
        timings: &mut SweepTimings,
    ) -> Result<ResultTable, SweepError> {
        let manager = self.parallel_manager();

        let start = Instant::now();
        let parts = manager.run(combinations.len(), |rank, range| {
            let mut local = model.clone();
            let mut rows = Vec::with_capacity(range.len());
            for index in range {
                if progress.is_some_and(SweepProgress::is_cancelled) {
                    return Err(SweepError::Cancelled);
                }
                let row = self.solve_combination(
                    &mut local,
                    index,
                    &combinations.rows[index],
                    optimize,
                    reinitialize,
                );
                if let Some(p) = progress {
                    p.record(row.is_success());
                }
                rows.push(row);
            }
            tracing::debug!(rank, rows = rows.len(), "rank finished its partition");
            Ok(rows)
        });
        timings.sweep_solves += start.elapsed();

        let start = Instant::now();
        let parts = parts.into_iter().collect::<Result<Vec<_>, _>>()?;
        let table = ResultTable::gather(
            combinations.names.clone(),
            self.config.output_names(),
            parts,
        );
        timings.gathering_results += start.elapsed();

        tracing::info!(
            rows = table.len(),
            failed = table.failure_count(),
            "sweep solves finished"
        );
        Ok(table)
    }

    /// Assign, solve and read back one combination.
    fn solve_combination<M: Model>(
        &self,
        model: &mut M,
        index: usize,
        values: &[f64],
        optimize: &dyn Optimize<M>,
        reinitialize: Option<&dyn Reinitialize<M>>,
    ) -> ResultRow {
        let outcome = match self.try_solve(model, values, optimize, reinitialize) {
            Ok(outputs) => RowOutcome::Success(outputs),
            Err(reason) => {
                tracing::debug!(index, %reason, "combination failed");
                RowOutcome::Failed(reason)
            }
        };
        ResultRow {
            index,
            inputs: values.to_vec(),
            outcome,
        }
    }

    fn try_solve<M: Model>(
        &self,
        model: &mut M,
        values: &[f64],
        optimize: &dyn Optimize<M>,
        reinitialize: Option<&dyn Reinitialize<M>>,
    ) -> Result<Vec<f64>, String> {
        for (param, &value) in self.config.parameters.iter().zip(values) {
            model
                .set_value(&param.quantity, value)
                .map_err(|e| format!("assigning `{}`: {e}", param.name))?;
        }

        let options = &self.config.solve_options;
        let policy = self.config.reinitialize;

        if policy == ReinitializePolicy::BeforeEachSolve
            && let Some(reinit) = reinitialize
        {
            reinit
                .reinitialize(model, options)
                .map_err(|e| format!("reinitialize failed: {e}"))?;
        }

        let mut attempt = solve_once(model, optimize, options);
        if attempt.is_err()
            && policy == ReinitializePolicy::OnFailure
            && let Some(reinit) = reinitialize
        {
            reinit
                .reinitialize(model, options)
                .map_err(|e| format!("reinitialize failed: {e}"))?;
            attempt = solve_once(model, optimize, options);
        }
        attempt?;

        self.config
            .outputs
            .iter()
            .map(|output| {
                model
                    .value(&output.quantity)
                    .map_err(|e| format!("reading `{}`: {e}", output.name))
            })
            .collect()
    }

    /// Write the configured result files, keeping the outcome on failure.
    fn write_outputs(&self, mut outcome: SweepOutcome) -> Result<SweepOutcome, SweepError> {
        let start = Instant::now();
        let written = self.write_table(&outcome.table, outcome.seed);
        outcome.timings.writing_files = start.elapsed();

        match written {
            Ok(()) => Ok(outcome),
            Err(source) => Err(SweepError::Persist {
                outcome: Box::new(outcome),
                source: Box::new(source),
            }),
        }
    }

    pub(crate) fn write_table(&self, table: &ResultTable, seed: u64) -> Result<(), SweepError> {
        if let Some(path) = &self.config.csv_path {
            io::write_csv(table, path)?;
            tracing::info!(path = %path.display(), "wrote csv results");
        }
        if let Some(path) = &self.config.archive_path {
            let archive = ResultArchive::from_table(table, seed);
            io::write_archive(&archive, path)?;
            tracing::info!(path = %path.display(), "wrote result archive");
        }
        Ok(())
    }
}

fn solve_once<M>(
    model: &mut M,
    optimize: &dyn Optimize<M>,
    options: &SolveOptions,
) -> Result<(), String> {
    match optimize.optimize(model, options) {
        Ok(status) if status.is_success() => Ok(()),
        Ok(status) => Err(format!("solve terminated: {status}")),
        Err(e) => Err(e.to_string()),
    }
}

/// Run a sweep with a one-off driver.
pub fn parameter_sweep<M: Model>(
    model: &M,
    config: SweepConfig,
    optimize: &dyn Optimize<M>,
    reinitialize: Option<&dyn Reinitialize<M>>,
) -> Result<SweepOutcome, SweepError> {
    SweepDriver::new(config).parameter_sweep(model, optimize, reinitialize, None)
}
