//! Job Backend Contract
//!
//! The narrow interface through which workflows submit jobs and observe
//! their progress. Anything able to start a job from a [`JobTemplate`],
//! block until it ends and report its state can drive a workflow.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::template::JobTemplate;

/// State of a submitted job as reported by the backend.
///
/// `Undetermined` doubles as the answer whenever the state cannot be
/// obtained (unknown handle, lost backend).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Undetermined,
    Queued,
    Running,
    Suspended,
    Done,
    Failed,
}

impl JobState {
    /// Returns true if the job will not change state anymore.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Undetermined)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Undetermined => "undetermined",
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Suspended => "suspended",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Opaque reference to a job known by a backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Backend assigned job identifier.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job management operations consumed by the workflow layer.
///
/// Implementations are shared between threads, so every method takes
/// `&self`.
pub trait JobBackend: Send + Sync {
    /// Starts a job for a fully merged template.
    fn submit(&self, template: &JobTemplate) -> Result<JobHandle, BackendError>;

    /// Blocks until the job reaches a terminal state.
    ///
    /// `None` waits forever. A bounded wait that expires returns
    /// [`BackendError::Timeout`].
    fn wait_terminated(&self, handle: &JobHandle, timeout: Option<Duration>) -> Result<(), BackendError>;

    /// Current state of the job.
    fn state(&self, handle: &JobHandle) -> JobState;

    /// Exit code of a finished job, if the backend knows one.
    fn exit_status(&self, _handle: &JobHandle) -> Option<i32> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Undetermined.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Suspended.is_terminal());
    }

    #[test]
    fn test_state_display_matches_serde() {
        for state in [JobState::Undetermined, JobState::Running, JobState::Done, JobState::Failed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }

    #[test]
    fn test_handle_serializes_as_plain_string() {
        let handle = JobHandle::new("42");
        assert_eq!(handle.id(), "42");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"42\"");
    }
}
