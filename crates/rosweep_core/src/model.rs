//! Capability interfaces between the sweep engine and an external process model.
//!
//! The engine never looks inside a model. It assigns and reads named quantities,
//! and hands the model to caller-supplied optimize/reinitialize callbacks.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, SerializeError, SolveError};

/// An opaque model handle.
///
/// Each sweep worker clones the handle it was given and solves on its own copy.
pub trait Model: Clone + Send + Sync {
    /// Assign a value to the named quantity.
    fn set_value(&mut self, name: &str, value: f64) -> Result<(), ModelError>;

    /// Read the current value of the named quantity.
    fn value(&self, name: &str) -> Result<f64, ModelError>;
}

/// Termination status reported by an optimize callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    MaxIterations,
    Other(String),
}

impl SolveStatus {
    /// Only an optimal termination counts as a successful solve.
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::MaxIterations => write!(f, "maximum iterations reached"),
            SolveStatus::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Options forwarded verbatim to the optimize and reinitialize callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SolveOptions {
    /// Raise on a non-optimal termination instead of returning the status
    #[serde(default)]
    pub check_termination: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    /// Free-form solver settings
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl SolveOptions {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// Solve the model in place and report how the solve terminated.
pub trait Optimize<M>: Sync {
    fn optimize(&self, model: &mut M, options: &SolveOptions) -> Result<SolveStatus, SolveError>;
}

impl<M, F> Optimize<M> for F
where
    F: Fn(&mut M, &SolveOptions) -> Result<SolveStatus, SolveError> + Sync,
{
    fn optimize(&self, model: &mut M, options: &SolveOptions) -> Result<SolveStatus, SolveError> {
        self(model, options)
    }
}

/// Reset a model's solve state before a new solve attempt.
pub trait Reinitialize<M>: Sync {
    fn reinitialize(&self, model: &mut M, options: &SolveOptions) -> Result<(), SolveError>;
}

impl<M, F> Reinitialize<M> for F
where
    F: Fn(&mut M, &SolveOptions) -> Result<(), SolveError> + Sync,
{
    fn reinitialize(&self, model: &mut M, options: &SolveOptions) -> Result<(), SolveError> {
        self(model, options)
    }
}

/// Optimization interchange formats a model can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemFormat {
    /// AMPL nonlinear problem file
    Nl,
    /// GAMS model file
    Gms,
}

impl ProblemFormat {
    pub fn from_tag(tag: &str) -> Result<Self, SerializeError> {
        match tag {
            "nl" => Ok(ProblemFormat::Nl),
            "gms" => Ok(ProblemFormat::Gms),
            other => Err(SerializeError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ProblemFormat::Nl => "nl",
            ProblemFormat::Gms => "gms",
        }
    }

    /// Subdirectory that collects files of this format
    pub fn directory(self) -> &'static str {
        match self {
            ProblemFormat::Nl => "nl_files",
            ProblemFormat::Gms => "gms_files",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Use model component names instead of generated indices
    pub symbolic_solver_labels: bool,
}

/// A model that can write itself as a problem file.
pub trait ProblemWriter {
    fn write_problem(
        &self,
        path: &Path,
        format: ProblemFormat,
        options: WriteOptions,
    ) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tags() {
        assert_eq!(ProblemFormat::from_tag("nl").unwrap(), ProblemFormat::Nl);
        assert_eq!(ProblemFormat::from_tag("gms").unwrap(), ProblemFormat::Gms);
        assert_eq!(ProblemFormat::Nl.directory(), "nl_files");
        assert_eq!(ProblemFormat::Gms.directory(), "gms_files");
        assert!(matches!(
            ProblemFormat::from_tag("xyz"),
            Err(SerializeError::UnsupportedFormat(tag)) if tag == "xyz"
        ));
    }

    #[test]
    fn test_only_optimal_is_success() {
        assert!(SolveStatus::Optimal.is_success());
        assert!(!SolveStatus::Infeasible.is_success());
        assert!(!SolveStatus::MaxIterations.is_success());
        assert!(!SolveStatus::Other("locally infeasible".into()).is_success());
    }

    #[test]
    fn test_solve_options_extra() {
        let options = SolveOptions::default().with("solver", "ipopt");
        assert_eq!(options.get("solver"), Some("ipopt"));
        assert_eq!(options.get("linear_solver"), None);
    }
}
