//! Parameter sweep module.
//!
//! A sweep varies a set of model inputs, solves the model at every combination
//! and records a set of outputs per combination.
//!
//! # Sampling
//!
//! Each parameter carries a [`SamplingKind`]. All parameters of one sweep must
//! share a [`SamplingCategory`]:
//! - fixed grids are combined as a full cross product, last parameter fastest
//! - random and Latin hypercube draws are combined row by row, `num_samples` rows
//!
//! ```ignore
//! use rosweep_core::sweep::{OutputSpec, ParameterSpec, SamplingKind, SweepConfig, SweepDriver};
//!
//! let config = SweepConfig::new(
//!     vec![
//!         ParameterSpec::new("A_comp", "fs.RO.A_comp",
//!             SamplingKind::Linear { lower: 1e-12, upper: 1e-11, num_samples: 4 }),
//!         ParameterSpec::new("B_comp", "fs.RO.B_comp",
//!             SamplingKind::Linear { lower: 1e-8, upper: 8e-8, num_samples: 4 }),
//!     ],
//!     vec![OutputSpec::new("LCOW", "fs.costing.LCOW")],
//! )
//! .csv_path("output/results.csv");
//!
//! // 16 combinations, solved across all available cores
//! let outcome = SweepDriver::new(config).parameter_sweep(&model, &optimize, None, None)?;
//! ```
//!
//! # Differential Sweeps
//!
//! [`differential_parameter_sweep`] runs a primary sweep and then perturbs every
//! primary point by a [`DifferentialSpec`] to measure local sensitivity.

mod combinations;
mod config;
mod differential;
mod driver;
mod progress;

pub use combinations::{Combinations, fixed_grid, resolve_seed};
pub use config::*;
pub use differential::*;
pub use driver::*;
pub use progress::*;
