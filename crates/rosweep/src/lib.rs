//! Reverse-osmosis parameter sweep studies
//!
//! This crate wires a closed-form RO flowsheet to the `rosweep_core` sweep engine:
//! - A surrogate flowsheet exposing named quantities (`fs.RO.A_comp`, `fs.costing.LCOW`, ...)
//! - The study's scenario catalogue (simple, differential and scaling runs)
//! - YAML-driven sweep parameters and flowsheet defaults
//! - Problem-file serialization of the solved flowsheet

use std::path::PathBuf;

pub mod flowsheet;
pub mod logging;
pub mod run;
pub mod scenarios;
pub mod yaml;

pub use flowsheet::RoSurrogate;
pub use logging::init_logging;
pub use run::{RunOptions, StudyOutcome, run_parameter_sweep};
pub use scenarios::{RunType, Scenario};

/// Directory that collects serialized problem files by default
pub fn package_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}
