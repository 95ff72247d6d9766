//! Parameter sweep engine for process-model studies
//!
//! This crate drives batches of model evaluations over varied inputs. It supports:
//! - Fixed grids (linear, geometric, reverse-geometric) combined as a cross product
//! - Seeded random sampling (uniform, normal) and Latin hypercube designs
//! - Rank-partitioned parallel execution with an index-ordered gather
//! - Per-combination failure isolation with optional reinitialize-and-retry
//! - Differential sweeps that perturb each nominal point for local sensitivity
//! - CSV and binary archive persistence of the result table
//! - Problem-file serialization of a solved model
//!
//! The process model is external. It enters through the [`Model`] trait and the
//! [`Optimize`]/[`Reinitialize`] capabilities.
//!
//! ```ignore
//! use rosweep_core::{OutputSpec, ParameterSpec, SamplingKind, SweepConfig, SweepDriver};
//!
//! let config = SweepConfig::new(
//!     vec![ParameterSpec::new(
//!         "A_comp",
//!         "fs.RO.A_comp",
//!         SamplingKind::Linear { lower: 1e-12, upper: 1e-11, num_samples: 100 },
//!     )],
//!     vec![OutputSpec::new("LCOW", "fs.costing.LCOW")],
//! );
//!
//! let outcome = SweepDriver::new(config).parameter_sweep(&model, &optimize, None, None)?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod error;
pub mod io;
pub mod model;
pub mod parallel;
pub mod results;
pub mod serialize;
pub mod sweep;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use error::{ConfigError, ModelError, SerializeError, SolveError, SweepError};
pub use model::{
    Model, Optimize, ProblemFormat, ProblemWriter, Reinitialize, SolveOptions, SolveStatus,
    WriteOptions,
};
pub use parallel::ParallelManager;
pub use results::{ResultRow, ResultTable, RowOutcome, SweepOutcome, SweepTimings};
pub use sweep::{
    Combinations, DiffMode, DifferentialOutcome, DifferentialSpec, OutputSpec, ParameterSpec,
    ReinitializePolicy, RowDelta, SamplingCategory, SamplingKind, SweepConfig, SweepDriver,
    SweepProgress, differential_parameter_sweep, parameter_sweep,
};
pub use serialize::serialize;
