//! Completion Notifier
//!
//! A mailbox collecting finished jobs from any number of threads. Jobs come
//! out in the order they were notified and each one is handed to exactly
//! one receiver.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

use crate::workflow::Job;

#[derive(Debug, Default)]
struct Mailbox {
    jobs: Mutex<VecDeque<Job>>,
    available: Condvar,
}

/// Cloneable handle to a shared completion mailbox.
///
/// # Example
///
/// ```rust,no_run
/// use std::thread;
/// use jobflow::execution::Notifier;
/// use jobflow::workflow::{Job, Workflow};
///
/// let notifier = Notifier::new();
/// for tag in ["A", "B"] {
///     let notifier = notifier.clone();
///     thread::spawn(move || {
///         Job::new(&Workflow::process())
///             .tag_with(tag)
///             .run("sleep", ["1"])
///             .synchronize()
///             .notify(&notifier);
///     });
/// }
/// for _ in 0..2 {
///     println!("finished: {}", notifier.receive_job().tag());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    mailbox: Arc<Mailbox>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.mailbox.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a finished job and wakes one waiting receiver.
    pub fn notify(&self, job: Job) {
        debug!("Job '{}' finished", job.tag());
        self.jobs().push_back(job);
        self.mailbox.available.notify_one();
    }

    /// Blocks until a job is available and takes it.
    pub fn receive_job(&self) -> Job {
        let mut jobs = self
            .mailbox
            .available
            .wait_while(self.jobs(), |jobs| jobs.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        loop {
            if let Some(job) = jobs.pop_front() {
                return job;
            }
            // only reachable after a poisoned wait
            jobs = self
                .mailbox
                .available
                .wait(jobs)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Waits at most `timeout` for a job.
    pub fn receive_job_timeout(&self, timeout: Duration) -> Option<Job> {
        let (mut jobs, _) = self
            .mailbox
            .available
            .wait_timeout_while(self.jobs(), timeout, |jobs| jobs.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        jobs.pop_front()
    }

    /// Takes a job if one is already waiting.
    pub fn try_receive_job(&self) -> Option<Job> {
        self.jobs().pop_front()
    }

    /// Number of jobs waiting to be received.
    pub fn pending(&self) -> usize {
        self.jobs().len()
    }
}
