//! In-memory backend for tests.
//!
//! The first argument of a submitted command is read as its run time in
//! milliseconds. `false` ends `Failed`, `reject` is refused at submission,
//! everything else ends `Done`. Submission and completion instants are
//! recorded so tests can check ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use super::backend::{JobBackend, JobHandle, JobState};
use crate::error::BackendError;
use crate::template::JobTemplate;

#[derive(Debug, Clone)]
pub(crate) struct FakeJob {
    pub template: JobTemplate,
    pub submitted_at: Instant,
    pub finishes_at: Instant,
    pub outcome: JobState,
}

#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    jobs: Mutex<Vec<FakeJob>>,
    unreachable: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every wait and state query fail as if the backend was gone.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<FakeJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    fn job(&self, handle: &JobHandle) -> Result<FakeJob, BackendError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BackendError::Communication("fake backend unreachable".to_string()));
        }
        handle
            .id()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.jobs.lock().unwrap().get(index).cloned())
            .ok_or_else(|| BackendError::UnknownJob(handle.id().to_string()))
    }
}

impl JobBackend for FakeBackend {
    fn submit(&self, template: &JobTemplate) -> Result<JobHandle, BackendError> {
        if template.remote_command == "reject" {
            return Err(BackendError::Spawn {
                command: template.remote_command.clone(),
                message: "rejected by fake backend".to_string(),
            });
        }

        let run_time = template
            .args
            .first()
            .and_then(|arg| arg.parse::<u64>().ok())
            .unwrap_or(0);
        let outcome = if template.remote_command == "false" {
            JobState::Failed
        } else {
            JobState::Done
        };

        let now = Instant::now();
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(FakeJob {
            template: template.clone(),
            submitted_at: now,
            finishes_at: now + Duration::from_millis(run_time),
            outcome,
        });
        Ok(JobHandle::new((jobs.len() - 1).to_string()))
    }

    fn wait_terminated(&self, handle: &JobHandle, timeout: Option<Duration>) -> Result<(), BackendError> {
        let job = self.job(handle)?;
        let remaining = job.finishes_at.saturating_duration_since(Instant::now());

        match timeout {
            Some(limit) if limit < remaining => {
                thread::sleep(limit);
                Err(BackendError::Timeout(handle.id().to_string()))
            }
            _ => {
                thread::sleep(remaining);
                Ok(())
            }
        }
    }

    fn state(&self, handle: &JobHandle) -> JobState {
        match self.job(handle) {
            Ok(job) if Instant::now() >= job.finishes_at => job.outcome,
            Ok(_) => JobState::Running,
            Err(_) => JobState::Undetermined,
        }
    }

    fn exit_status(&self, handle: &JobHandle) -> Option<i32> {
        match self.state(handle) {
            JobState::Done => Some(0),
            JobState::Failed => Some(1),
            _ => None,
        }
    }
}
