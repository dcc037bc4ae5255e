//! Error Types
//!
//! Errors raised while submitting and tracking jobs, and while loading
//! flow files. Backend errors are `Clone` because a [`Job`] keeps the
//! first failure it hits as its sticky error.
//!
//! [`Job`]: crate::workflow::Job

use thiserror::Error;

/// Failures reported by a [`JobBackend`](crate::execution::JobBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The handle does not belong to this backend or was already dropped.
    #[error("unknown job '{0}'")]
    UnknownJob(String),

    /// The request cannot be turned into a job.
    #[error("invalid job template: {0}")]
    InvalidTemplate(String),

    /// The backend refused or failed to start the job.
    #[error("failed to start '{command}': {message}")]
    Spawn { command: String, message: String },

    /// A bounded wait expired before the job reached a terminal state.
    #[error("timed out waiting for job '{0}'")]
    Timeout(String),

    /// The backend could not be reached or is in an inconsistent state.
    #[error("backend communication failed: {0}")]
    Communication(String),
}

/// Errors recorded on a [`Job`](crate::workflow::Job).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// No backend was configured when the workflow was built.
    #[error("no job backend configured for workflow")]
    NoBackend,

    /// The job was created without a workflow context.
    #[error("no workflow defined")]
    NoWorkflow,

    /// The backend rejected a submission.
    #[error("submission of '{command}' failed: {source}")]
    Submission {
        command: String,
        #[source]
        source: BackendError,
    },

    /// The chain has no task to operate on.
    #[error("job task not available")]
    TaskNotAvailable,

    /// The thread building the job panicked before it could report back.
    #[error("job aborted: {0}")]
    Aborted(String),
}

/// Errors raised while loading or validating a flow file.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to read flow file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse flow file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid flow: {0}")]
    Invalid(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}
