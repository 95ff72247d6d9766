//! Differential sweeps: perturb every primary point to measure local sensitivity.
//!
//! The primary sweep runs first. Then, for each primary row, `num_diff_samples`
//! perturbed points are drawn relative to that row's own values (not the global
//! range) and solved with the same optimize/reinitialize contract. All
//! differential parameters are perturbed together in a perturbed point;
//! parameters without a spec keep their nominal value.

use std::time::Instant;

use rand::SeedableRng;
use rand::distr::Uniform;
use rand_distr::Distribution;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SweepError};
use crate::model::{Model, Optimize, Reinitialize};
use crate::results::{ResultRow, ResultTable, SweepOutcome, SweepTimings};

use super::{Combinations, DifferentialSpec, SweepDriver, SweepProgress};

/// Mixed into the sweep seed so perturbations do not replay the primary draws
const DIFF_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Difference between a perturbed row and its primary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDelta {
    /// Index of the primary row
    pub primary: usize,
    /// Index of the perturbed row
    pub perturbed: usize,
    /// `perturbed - primary` per input column
    pub inputs: Vec<f64>,
    /// `perturbed - primary` per output column; `None` if either solve failed
    pub outputs: Option<Vec<f64>>,
}

/// Everything a finished differential sweep returns
#[derive(Debug, Clone)]
pub struct DifferentialOutcome {
    /// The primary sweep
    pub primary: SweepOutcome,
    /// Perturbed points, indexed from zero
    pub perturbed: ResultTable,
    /// Primary row index of each perturbed row
    pub parents: Vec<usize>,
    pub deltas: Vec<RowDelta>,
    /// Combined timings of both stages
    pub timings: SweepTimings,
}

impl DifferentialOutcome {
    /// Primary rows followed by perturbed rows, re-indexed, as one table
    pub fn combined_table(&self) -> ResultTable {
        let offset = self.primary.table.len();
        let mut table = self.primary.table.clone();
        table
            .rows
            .extend(self.perturbed.rows.iter().cloned().map(|mut row| {
                row.index += offset;
                row
            }));
        table
    }
}

/// Run a primary sweep plus differential perturbations around each primary point.
///
/// Result files configured on the driver receive the combined table.
pub fn differential_parameter_sweep<M: Model>(
    driver: &SweepDriver,
    model: &M,
    specs: &[DifferentialSpec],
    num_diff_samples: usize,
    optimize: &dyn Optimize<M>,
    reinitialize: Option<&dyn Reinitialize<M>>,
    progress: Option<&SweepProgress>,
) -> Result<DifferentialOutcome, SweepError> {
    validate_specs(driver, specs, num_diff_samples)?;

    let mut primary_config = driver.config().clone();
    primary_config.csv_path = None;
    primary_config.archive_path = None;
    let primary_driver = SweepDriver::new(primary_config);
    let primary = primary_driver.parameter_sweep(model, optimize, reinitialize, progress)?;

    let mut timings = primary.timings;
    let start = Instant::now();
    let (perturbed_combinations, parents) =
        perturb(&primary.table, specs, num_diff_samples, primary.seed)?;
    timings.building_combinations += start.elapsed();

    tracing::info!(
        primary = primary.table.len(),
        perturbed = perturbed_combinations.len(),
        "starting differential stage"
    );

    if let Some(p) = progress {
        p.extend(perturbed_combinations.len());
    }
    let perturbed = primary_driver.evaluate(
        model,
        &perturbed_combinations,
        optimize,
        reinitialize,
        progress,
        &mut timings,
    )?;

    let deltas = perturbed
        .rows
        .iter()
        .zip(&parents)
        .map(|(row, &parent)| row_delta(&primary.table.rows[parent], row))
        .collect();

    let mut outcome = DifferentialOutcome {
        primary,
        perturbed,
        parents,
        deltas,
        timings,
    };

    let start = Instant::now();
    let combined = outcome.combined_table();
    let written = driver.write_table(&combined, outcome.primary.seed);
    outcome.timings.writing_files += start.elapsed();

    match written {
        Ok(()) => Ok(outcome),
        Err(source) => Err(SweepError::Persist {
            outcome: Box::new(SweepOutcome {
                global_results: combined.output_arrays(),
                table: combined,
                seed: outcome.primary.seed,
                timings: outcome.timings,
            }),
            source: Box::new(source),
        }),
    }
}

fn validate_specs(
    driver: &SweepDriver,
    specs: &[DifferentialSpec],
    num_diff_samples: usize,
) -> Result<(), ConfigError> {
    let config = driver.config();
    config.validate()?;
    if num_diff_samples == 0 {
        return Err(ConfigError::ZeroSamples {
            name: "num_diff_samples".to_string(),
        });
    }
    let mut seen = FxHashSet::default();
    for spec in specs {
        spec.validate(&config.parameters)?;
        if !seen.insert(spec.parameter.as_str()) {
            return Err(ConfigError::DuplicateName {
                kind: "differential",
                name: spec.parameter.clone(),
            });
        }
    }
    Ok(())
}

/// Draw the perturbed combination set. Returns it with each row's primary index.
fn perturb(
    primary: &ResultTable,
    specs: &[DifferentialSpec],
    num_diff_samples: usize,
    seed: u64,
) -> Result<(Combinations, Vec<usize>), ConfigError> {
    // Column index -> (spec, delta distribution)
    let mut columns = Vec::with_capacity(specs.len());
    for spec in specs {
        let Some(column) = primary.input_names.iter().position(|n| *n == spec.parameter) else {
            return Err(ConfigError::UnknownDifferentialParameter(
                spec.parameter.clone(),
            ));
        };
        let (lo, hi) = spec.delta_range();
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        let dist = Uniform::new_inclusive(lo, hi).map_err(|e| ConfigError::InvalidDifferential {
            name: spec.parameter.clone(),
            reason: e.to_string(),
        })?;
        columns.push((column, spec, dist));
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed ^ DIFF_SEED_SALT);
    let mut rows = Vec::with_capacity(primary.len() * num_diff_samples);
    let mut parents = Vec::with_capacity(rows.capacity());

    for row in &primary.rows {
        for _ in 0..num_diff_samples {
            let mut values = row.inputs.clone();
            for (column, spec, dist) in &columns {
                let delta = dist.sample(&mut rng);
                values[*column] = spec.apply(row.inputs[*column], delta);
            }
            rows.push(values);
            parents.push(row.index);
        }
    }

    Ok((
        Combinations {
            names: primary.input_names.clone(),
            rows,
            shape: None,
        },
        parents,
    ))
}

fn row_delta(primary: &ResultRow, perturbed: &ResultRow) -> RowDelta {
    let inputs = perturbed
        .inputs
        .iter()
        .zip(&primary.inputs)
        .map(|(p, n)| p - n)
        .collect();
    let outputs = match (perturbed.outputs(), primary.outputs()) {
        (Some(p), Some(n)) => Some(p.iter().zip(n).map(|(p, n)| p - n).collect()),
        _ => None,
    };
    RowDelta {
        primary: primary.index,
        perturbed: perturbed.index,
        inputs,
        outputs,
    }
}
