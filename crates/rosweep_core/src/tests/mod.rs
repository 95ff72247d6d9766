//! Integration tests for the sweep engine
//!
//! Tests are organized by topic:
//! - `determinism` - Seeds, grid order and reproducible draws
//! - `failures` - Failure isolation, reinitialize policies, cancellation
//! - `persistence` - CSV and archive files written by a sweep
//! - `parallel` - Worker-count independence of the gathered table
//! - `differential` - Perturbation sweeps around primary points
//!
//! All tests drive [`TestModel`], a closed-form stand-in for a process model.

mod determinism;
mod failures;
mod persistence;

use std::collections::BTreeMap;

use crate::error::{ModelError, SolveError};
use crate::model::{Model, SolveOptions, SolveStatus};
use crate::sweep::{OutputSpec, ParameterSpec, SamplingKind};

/// Model with two inputs `fs.x`, `fs.y` and one output `fs.out = x + 10 y`.
///
/// Negative `x` is infeasible. With `needs_init` set, a solve only converges
/// after a reinitialize.
#[derive(Debug, Clone)]
pub(crate) struct TestModel {
    values: BTreeMap<String, f64>,
    needs_init: bool,
    initialized: bool,
}

impl TestModel {
    pub(crate) fn new() -> Self {
        let values = ["fs.x", "fs.y", "fs.out"]
            .into_iter()
            .map(|name| (name.to_string(), 0.0))
            .collect();
        Self {
            values,
            needs_init: false,
            initialized: false,
        }
    }

    pub(crate) fn needing_init() -> Self {
        Self {
            needs_init: true,
            ..Self::new()
        }
    }
}

impl Model for TestModel {
    fn set_value(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownQuantity(name.to_string()))?;
        *slot = value;
        self.initialized = false;
        Ok(())
    }

    fn value(&self, name: &str) -> Result<f64, ModelError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownQuantity(name.to_string()))
    }
}

pub(crate) fn optimize(model: &mut TestModel, _: &SolveOptions) -> Result<SolveStatus, SolveError> {
    if model.needs_init && !model.initialized {
        return Err(SolveError::NotConverged("model not initialized".into()));
    }
    let x = model.value("fs.x")?;
    let y = model.value("fs.y")?;
    if x < 0.0 {
        return Ok(SolveStatus::Infeasible);
    }
    model.values.insert("fs.out".into(), x + 10.0 * y);
    Ok(SolveStatus::Optimal)
}

pub(crate) fn reinitialize(model: &mut TestModel, _: &SolveOptions) -> Result<(), SolveError> {
    model.initialized = true;
    Ok(())
}

pub(crate) fn linear(name: &str, lower: f64, upper: f64, num_samples: usize) -> ParameterSpec {
    ParameterSpec::new(
        name,
        format!("fs.{name}"),
        SamplingKind::Linear {
            lower,
            upper,
            num_samples,
        },
    )
}

pub(crate) fn uniform(name: &str, lower: f64, upper: f64) -> ParameterSpec {
    ParameterSpec::new(name, format!("fs.{name}"), SamplingKind::Uniform { lower, upper })
}

pub(crate) fn out() -> Vec<OutputSpec> {
    vec![OutputSpec::new("out", "fs.out")]
}
