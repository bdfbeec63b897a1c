//! Error types for problem assembly and solving.

use pcm_core::PcmError;
use thiserror::Error;

use crate::container::BuildStage;
use crate::problem::ProblemState;
use crate::traits::TerminationStatus;

/// Errors raised while assembling, solving or exporting a problem.
#[derive(Error, Debug)]
pub enum BuildError {
    /// No builder or nodal mapping exists for this combination
    #[error("no formulation registered for {entity} / {formulation} under {network}")]
    UnimplementedFormulation {
        entity: String,
        formulation: String,
        network: String,
    },

    /// An entry with this name already exists
    #[error("{kind} '{name}' is already registered")]
    ConflictingRegistration { kind: &'static str, name: String },

    /// Lookup of an absent template or container entry
    #[error("{kind} '{name}' not found")]
    MissingEntry { kind: &'static str, name: String },

    #[error("no math backend attached or supplied to solve {0}")]
    MissingBackend(String),

    #[error("{problem} did not reach a feasible point: {status}")]
    Infeasible {
        problem: String,
        status: TerminationStatus,
    },

    #[error("{operation} is not valid while the problem is {state}")]
    InvalidState {
        operation: &'static str,
        state: ProblemState,
    },

    /// The pipeline tried to go back to an earlier stage
    #[error("cannot enter stage {requested:?} after {current:?}")]
    StageOrder {
        current: BuildStage,
        requested: BuildStage,
    },

    #[error("time series '{label}' missing for {owner}")]
    MissingTimeSeries { owner: String, label: String },

    #[error("data error: {0}")]
    Data(#[from] PcmError),

    /// Backend failure other than a termination status
    #[error("backend error: {0}")]
    Backend(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for results in this crate.
pub type BuildResult<T> = Result<T, BuildError>;

// Sinks use anyhow internally; anything that reaches the caller is an export failure.
impl From<anyhow::Error> for BuildError {
    fn from(err: anyhow::Error) -> Self {
        BuildError::Export(format!("{err:#}"))
    }
}

impl From<toml::de::Error> for BuildError {
    fn from(err: toml::de::Error) -> Self {
        BuildError::Config(err.to_string())
    }
}
