//! Orchestration error taxonomy.
//!
//! Every error is terminal: the core never retries. Each variant carries
//! enough context (cluster id, instance id, underlying transport error)
//! to diagnose a failure without re-driving the operation.

use thiserror::Error;

use quiesce_control::{ConfigError, ControlError};
use quiesce_state::StoreError;

/// Result type alias for orchestration operations.
pub type OrchestrateResult<T> = Result<T, OrchestrateError>;

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("cluster not found: {cluster}")]
    NotFound { cluster: String },

    #[error("cluster {cluster} has no member instances")]
    EmptyTopology { cluster: String },

    #[error("mutation against {target} failed: {source}")]
    MutationFailed {
        target: String,
        #[source]
        source: ControlError,
    },

    #[error("status check for {target} failed: {detail}")]
    DescribeFailed { target: String, detail: String },

    #[error("{target} did not become available within {budget_secs}s: {detail}")]
    ConvergenceTimeout {
        target: String,
        budget_secs: u64,
        detail: String,
    },

    #[error("failed to load control configuration: {0}")]
    ConfigLoad(#[from] ConfigError),

    #[error("outcome store error: {0}")]
    Sink(#[from] StoreError),
}
