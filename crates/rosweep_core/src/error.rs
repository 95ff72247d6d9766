//! Error taxonomy for sweep configuration, model access, solves and persistence.

use std::path::PathBuf;

/// Fatal, pre-run configuration problems. Raised before any solve starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one sweep parameter required")]
    NoParameters,

    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("parameter `{name}`: {reason}")]
    InvalidBounds { name: String, reason: String },

    #[error("parameter `{name}`: sample count must be at least 1")]
    ZeroSamples { name: String },

    #[error("unknown sampling kind `{0}`")]
    UnknownSamplingKind(String),

    #[error("sampling kind `{0}` needs a sample count")]
    MissingSampleCount(String),

    #[error("the grids of {parameters} parameters multiply past the addressable row count")]
    TooManyCombinations { parameters: usize },

    #[error("cannot mix {first:?} sampling (`{first_name}`) with {second:?} sampling (`{second_name}`)")]
    MixedSampling {
        first: crate::sweep::SamplingCategory,
        first_name: String,
        second: crate::sweep::SamplingCategory,
        second_name: String,
    },

    #[error("differential spec `{0}` does not name a sweep parameter")]
    UnknownDifferentialParameter(String),

    #[error("differential spec `{name}`: {reason}")]
    InvalidDifferential { name: String, reason: String },

    #[error("model quantity `{quantity}` referenced by `{name}` is not available: {source}")]
    UnresolvedQuantity {
        name: String,
        quantity: String,
        #[source]
        source: ModelError,
    },

    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// Errors raised by a model handle when reading or assigning a quantity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown quantity `{0}`")]
    UnknownQuantity(String),

    #[error("quantity `{name}` rejected value {value}: {reason}")]
    InvalidValue {
        name: String,
        value: f64,
        reason: String,
    },

    #[error("quantity `{0}` is fixed and cannot be assigned")]
    Fixed(String),
}

/// Errors from an optimize or reinitialize callback.
///
/// These are non-fatal inside a sweep: the affected row is marked failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("solver did not converge: {0}")]
    NotConverged(String),

    #[error("model evaluation failed: {0}")]
    Evaluation(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors from model problem-file serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("unsupported serialization format `{0}` (expected `nl` or `gms`)")]
    UnsupportedFormat(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error of a sweep call.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("sweep cancelled")]
    Cancelled,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error for {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("archive error for {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("malformed result file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The sweep finished but its results could not be persisted
    #[error("sweep finished but results could not be written: {source}")]
    Persist {
        outcome: Box<crate::results::SweepOutcome>,
        #[source]
        source: Box<SweepError>,
    },
}

impl SweepError {
    /// Recover the in-memory results of a sweep whose file writes failed
    pub fn into_outcome(self) -> Option<crate::results::SweepOutcome> {
        match self {
            SweepError::Persist { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
