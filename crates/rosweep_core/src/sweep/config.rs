//! Configuration types for parameter sweeps.

use std::path::PathBuf;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Model, SolveOptions};

/// Strategy generating values for one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SamplingKind {
    /// Independent uniform draws on `[lower, upper]`
    Uniform { lower: f64, upper: f64 },
    /// Independent normal draws
    Normal { mean: f64, std_dev: f64 },
    /// Evenly spaced grid, both ends included
    Linear {
        lower: f64,
        upper: f64,
        num_samples: usize,
    },
    /// Log-spaced grid, both ends included
    Geom {
        lower: f64,
        upper: f64,
        num_samples: usize,
    },
    /// Mirror image of `Geom`: points cluster towards `upper`
    ReverseGeom {
        lower: f64,
        upper: f64,
        num_samples: usize,
    },
    /// One jittered point per equal-width stratum, strata shuffled
    LatinHypercube { lower: f64, upper: f64 },
}

/// How a sampling kind combines with the others in a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingCategory {
    /// Deterministic grids, combined as a cross product
    Fixed,
    /// Seeded independent draws, combined row by row
    Random,
    /// Seeded stratified draws, combined row by row
    LatinHypercube,
}

impl SamplingKind {
    /// Build a sampling kind from its library name and numeric arguments.
    ///
    /// Accepts both the class-style names (`LinearSample`) and short names
    /// (`linear`). For `Normal` the two values are mean and standard deviation.
    /// Grid kinds need `num_samples`; random kinds take their row count from
    /// the sweep and ignore it.
    pub fn from_name(
        kind: &str,
        first: f64,
        second: f64,
        num_samples: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let count = || num_samples.ok_or_else(|| ConfigError::MissingSampleCount(kind.to_string()));
        match kind {
            "UniformSample" | "uniform" => Ok(SamplingKind::Uniform {
                lower: first,
                upper: second,
            }),
            "NormalSample" | "normal" => Ok(SamplingKind::Normal {
                mean: first,
                std_dev: second,
            }),
            "LinearSample" | "linear" => Ok(SamplingKind::Linear {
                lower: first,
                upper: second,
                num_samples: count()?,
            }),
            "GeomSample" | "geom" | "log_linear" => Ok(SamplingKind::Geom {
                lower: first,
                upper: second,
                num_samples: count()?,
            }),
            "ReverseGeomSample" | "reverse_geom" | "reverse_log_linear" => {
                Ok(SamplingKind::ReverseGeom {
                    lower: first,
                    upper: second,
                    num_samples: count()?,
                })
            }
            "LatinHypercubeSample" | "latin_hypercube" => Ok(SamplingKind::LatinHypercube {
                lower: first,
                upper: second,
            }),
            other => Err(ConfigError::UnknownSamplingKind(other.to_string())),
        }
    }

    pub fn category(&self) -> SamplingCategory {
        match self {
            SamplingKind::Linear { .. }
            | SamplingKind::Geom { .. }
            | SamplingKind::ReverseGeom { .. } => SamplingCategory::Fixed,
            SamplingKind::Uniform { .. } | SamplingKind::Normal { .. } => SamplingCategory::Random,
            SamplingKind::LatinHypercube { .. } => SamplingCategory::LatinHypercube,
        }
    }

    /// Bounds of the sampled range, if the kind has one
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match *self {
            SamplingKind::Uniform { lower, upper }
            | SamplingKind::Linear { lower, upper, .. }
            | SamplingKind::Geom { lower, upper, .. }
            | SamplingKind::ReverseGeom { lower, upper, .. }
            | SamplingKind::LatinHypercube { lower, upper } => Some((lower, upper)),
            SamplingKind::Normal { .. } => None,
        }
    }

    /// Explicit grid size of a fixed kind
    pub fn grid_size(&self) -> Option<usize> {
        match *self {
            SamplingKind::Linear { num_samples, .. }
            | SamplingKind::Geom { num_samples, .. }
            | SamplingKind::ReverseGeom { num_samples, .. } => Some(num_samples),
            _ => None,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBounds {
            name: name.to_string(),
            reason,
        };

        if let SamplingKind::Normal { mean, std_dev } = *self {
            if !mean.is_finite() || !std_dev.is_finite() {
                return Err(invalid(format!(
                    "mean ({mean}) and std_dev ({std_dev}) must be finite"
                )));
            }
            if std_dev < 0.0 {
                return Err(invalid(format!("std_dev ({std_dev}) must be non-negative")));
            }
            return Ok(());
        }

        if let Some((lower, upper)) = self.bounds() {
            if !lower.is_finite() || !upper.is_finite() {
                return Err(invalid(format!(
                    "bounds ({lower}, {upper}) must be finite"
                )));
            }
            if lower > upper {
                return Err(invalid(format!(
                    "lower bound ({lower}) exceeds upper bound ({upper})"
                )));
            }
        }

        if let SamplingKind::Geom { lower, .. } | SamplingKind::ReverseGeom { lower, .. } = *self
            && lower <= 0.0
        {
            return Err(invalid(format!(
                "log-spaced sampling needs a positive lower bound, got {lower}"
            )));
        }

        if self.grid_size() == Some(0) {
            return Err(ConfigError::ZeroSamples {
                name: name.to_string(),
            });
        }

        Ok(())
    }
}

/// A swept model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Unique key, used as the result column name
    pub name: String,
    /// Model quantity the sampled values are assigned to
    pub quantity: String,
    #[serde(flatten)]
    pub kind: SamplingKind,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>, kind: SamplingKind) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            kind,
        }
    }
}

/// A model quantity recorded after each solve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    pub quantity: String,
}

impl OutputSpec {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

/// How a differential perturbation is applied to its nominal value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiffMode {
    /// `nominal + delta`, delta drawn from the relative bounds
    Sum,
    /// `nominal + delta * (nominal_upper - nominal_lower)`
    #[default]
    Percentile,
    /// `nominal * (1 + delta)`
    Product,
}

/// Perturbation applied around each nominal sample of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialSpec {
    /// Name of the sweep parameter being perturbed
    pub parameter: String,
    #[serde(default)]
    pub mode: DiffMode,
    /// Signed lower delta
    pub relative_lower: f64,
    /// Signed upper delta
    pub relative_upper: f64,
    pub nominal_lower: f64,
    pub nominal_upper: f64,
}

impl DifferentialSpec {
    /// Percentile-mode spec whose nominal range is taken from the swept parameter.
    ///
    /// Normal parameters have no range to scale by and are rejected.
    pub fn percentile(
        parameter: &ParameterSpec,
        relative_lower: f64,
        relative_upper: f64,
    ) -> Result<Self, ConfigError> {
        let Some((nominal_lower, nominal_upper)) = parameter.kind.bounds() else {
            return Err(ConfigError::InvalidDifferential {
                name: parameter.name.clone(),
                reason: "percentile mode needs a bounded sampling kind".to_string(),
            });
        };
        Ok(Self {
            parameter: parameter.name.clone(),
            mode: DiffMode::Percentile,
            relative_lower,
            relative_upper,
            nominal_lower,
            nominal_upper,
        })
    }

    /// Range of the additive or multiplicative delta
    pub fn delta_range(&self) -> (f64, f64) {
        match self.mode {
            DiffMode::Sum | DiffMode::Product => (self.relative_lower, self.relative_upper),
            DiffMode::Percentile => {
                let span = self.nominal_upper - self.nominal_lower;
                (self.relative_lower * span, self.relative_upper * span)
            }
        }
    }

    /// Apply a drawn delta to a nominal value
    pub fn apply(&self, nominal: f64, delta: f64) -> f64 {
        match self.mode {
            DiffMode::Sum | DiffMode::Percentile => nominal + delta,
            DiffMode::Product => nominal * (1.0 + delta),
        }
    }

    pub(crate) fn validate(&self, parameters: &[ParameterSpec]) -> Result<(), ConfigError> {
        if !parameters.iter().any(|p| p.name == self.parameter) {
            return Err(ConfigError::UnknownDifferentialParameter(
                self.parameter.clone(),
            ));
        }
        let invalid = |reason: String| ConfigError::InvalidDifferential {
            name: self.parameter.clone(),
            reason,
        };
        let values = [
            self.relative_lower,
            self.relative_upper,
            self.nominal_lower,
            self.nominal_upper,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid("bounds must be finite".to_string()));
        }
        if self.relative_lower > self.relative_upper {
            return Err(invalid(format!(
                "relative lower ({}) exceeds relative upper ({})",
                self.relative_lower, self.relative_upper
            )));
        }
        if self.mode == DiffMode::Percentile && self.nominal_lower >= self.nominal_upper {
            return Err(invalid(format!(
                "percentile mode needs a nominal range, got ({}, {})",
                self.nominal_lower, self.nominal_upper
            )));
        }
        Ok(())
    }
}

/// When the reinitialize callback runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReinitializePolicy {
    Never,
    /// Before every solve
    BeforeEachSolve,
    /// After a failed solve, followed by a single retry
    #[default]
    OnFailure,
}

/// Configuration for one sweep call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub parameters: Vec<ParameterSpec>,
    pub outputs: Vec<OutputSpec>,
    /// Rows drawn for random and Latin hypercube sweeps. Ignored by fixed grids.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Seed for random kinds. A fresh seed is drawn and reported when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub solve_options: SolveOptions,
    #[serde(default)]
    pub reinitialize: ReinitializePolicy,
    /// Number of rank partitions (defaults to CPU count)
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
    #[serde(default)]
    pub archive_path: Option<PathBuf>,
}

fn default_num_samples() -> usize {
    1
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
            outputs: Vec::new(),
            num_samples: default_num_samples(),
            seed: None,
            solve_options: SolveOptions::default(),
            reinitialize: ReinitializePolicy::default(),
            workers: default_workers(),
            csv_path: None,
            archive_path: None,
        }
    }
}

impl SweepConfig {
    pub fn new(parameters: Vec<ParameterSpec>, outputs: Vec<OutputSpec>) -> Self {
        Self {
            parameters,
            outputs,
            ..Default::default()
        }
    }

    pub fn num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn reinitialize(mut self, policy: ReinitializePolicy) -> Self {
        self.reinitialize = policy;
        self
    }

    pub fn solve_options(mut self, options: SolveOptions) -> Self {
        self.solve_options = options;
        self
    }

    pub fn csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = Some(path.into());
        self
    }

    pub fn archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = Some(path.into());
        self
    }

    /// Get the number of swept dimensions
    pub fn ndim(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|o| o.name.clone()).collect()
    }

    /// Shared sampling category of all parameters
    pub fn category(&self) -> Result<SamplingCategory, ConfigError> {
        let first = self.parameters.first().ok_or(ConfigError::NoParameters)?;
        let category = first.kind.category();
        for param in &self.parameters[1..] {
            if param.kind.category() != category {
                return Err(ConfigError::MixedSampling {
                    first: category,
                    first_name: first.name.clone(),
                    second: param.kind.category(),
                    second_name: param.name.clone(),
                });
            }
        }
        Ok(category)
    }

    /// Check everything that does not need a model handle
    pub fn validate(&self) -> Result<SamplingCategory, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        let mut seen = FxHashSet::default();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    kind: "parameter",
                    name: param.name.clone(),
                });
            }
            param.kind.validate(&param.name)?;
        }

        let mut seen = FxHashSet::default();
        for output in &self.outputs {
            if !seen.insert(output.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    kind: "output",
                    name: output.name.clone(),
                });
            }
        }

        let category = self.category()?;
        if category != SamplingCategory::Fixed && self.num_samples == 0 {
            return Err(ConfigError::ZeroSamples {
                name: self.parameters[0].name.clone(),
            });
        }
        self.combination_count()?;
        Ok(category)
    }

    /// Rows the sweep evaluates: the grid product for fixed kinds, `num_samples` otherwise
    pub fn combination_count(&self) -> Result<usize, ConfigError> {
        match self.category()? {
            SamplingCategory::Fixed => self.parameters.iter().try_fold(1usize, |total, param| {
                total
                    .checked_mul(param.kind.grid_size().unwrap_or(0))
                    .ok_or(ConfigError::TooManyCombinations {
                        parameters: self.ndim(),
                    })
            }),
            SamplingCategory::Random | SamplingCategory::LatinHypercube => Ok(self.num_samples),
        }
    }

    /// Check that every referenced quantity can be read from the model
    pub fn resolve<M: Model>(&self, model: &M) -> Result<(), ConfigError> {
        let parameters = self
            .parameters
            .iter()
            .map(|p| (&p.name, &p.quantity));
        let outputs = self.outputs.iter().map(|o| (&o.name, &o.quantity));
        for (name, quantity) in parameters.chain(outputs) {
            model
                .value(quantity)
                .map_err(|source| ConfigError::UnresolvedQuantity {
                    name: name.clone(),
                    quantity: quantity.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
