//! Job Builder
//!
//! A [`Job`] is one workflow instance: a chain of submitted tasks, a tag to
//! correlate it with, and the workflow it submits through. Chaining methods
//! consume and return the job so a whole pipeline reads as one expression:
//!
//! ```rust,no_run
//! use jobflow::execution::Notifier;
//! use jobflow::workflow::{Job, Workflow};
//!
//! let notifier = Notifier::new();
//! Job::new(&Workflow::process())
//!     .tag_with("A")
//!     .run("sleep", ["1"])      // first step
//!     .then_run("sleep", ["3"]) // starts after the first step ended
//!     .run("sleep", ["2"])      // runs alongside the second step
//!     .synchronize()            // waits for the last step
//!     .notify(&notifier);
//! ```
//!
//! The first failure (missing workflow, rejected submission) is kept on the
//! job and turns every further chaining call into a no-op, leaving the task
//! chain as it was.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::context::Workflow;
use super::logging::WorkflowLogger;
use super::task::{Task, TaskChain};
use crate::error::{BackendError, WorkflowError};
use crate::execution::{JobState, Notifier};
use crate::template::{merge_with_default, JobTemplate};

/// Fluent handle for one workflow instance.
#[derive(Debug)]
pub struct Job {
    workflow: Option<Arc<Workflow>>,
    chain: TaskChain,
    tag: String,
    error: Option<WorkflowError>,
    last_state: Option<JobState>,
}

impl Job {
    /// Creates an empty job submitting through `workflow`.
    pub fn new(workflow: &Arc<Workflow>) -> Self {
        Self::with_chain(workflow, TaskChain::new())
    }

    /// Creates a job continuing an existing task chain.
    pub fn with_chain(workflow: &Arc<Workflow>, chain: TaskChain) -> Self {
        Self {
            workflow: Some(Arc::clone(workflow)),
            chain,
            tag: String::new(),
            error: None,
            last_state: None,
        }
    }

    /// Creates a job from the outcome of building a workflow.
    ///
    /// A failed build yields a job already in error state, so the chain
    /// below it does nothing and the configuration error can be inspected
    /// at the end.
    pub fn try_new(workflow: Result<Arc<Workflow>, WorkflowError>) -> Self {
        match workflow {
            Ok(workflow) => Self::new(&workflow),
            Err(e) => {
                log::error!("Job created without workflow: {}", e);
                Self {
                    workflow: None,
                    chain: TaskChain::new(),
                    tag: String::new(),
                    error: Some(e),
                    last_state: None,
                }
            }
        }
    }

    /// Creates a job that is already in error state on `workflow`.
    pub(crate) fn failed(workflow: &Arc<Workflow>, error: WorkflowError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(workflow)
        }
    }

    /// Sets the correlation tag.
    pub fn tag_with(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Submits `command` without waiting for previous tasks.
    pub fn run<I, S>(self, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_with_template(JobTemplate::new(command, args))
    }

    /// Submits a partial template, completed from the workflow defaults.
    pub fn run_with_template(mut self, template: JobTemplate) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.begin("run");
        self.submit(template);
        self
    }

    /// Waits for the last task to end, then submits `command`.
    ///
    /// The previous task's outcome does not matter: a failed step is
    /// followed like a successful one.
    pub fn then_run<I, S>(self, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.then_run_with_template(JobTemplate::new(command, args))
    }

    /// Waits for the last task to end, then submits a partial template.
    pub fn then_run_with_template(mut self, template: JobTemplate) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.begin("then_run");
        if !self.chain.is_empty() {
            let previous = self.wait_for_end_and_state(None);
            self.infof(format_args!("previous task ended with state {}", previous));
        }
        self.submit(template);
        self
    }

    /// Blocks until the last task reaches a terminal state.
    ///
    /// The observed state is available through [`Job::last_state`]. An
    /// empty chain or a backend that cannot be reached gives
    /// [`JobState::Undetermined`] instead of an error.
    pub fn synchronize(self) -> Self {
        self.barrier(None, "synchronize")
    }

    /// Like [`Job::synchronize`], but gives up after `timeout`.
    ///
    /// An expired wait is recorded as [`JobState::Undetermined`]; the task
    /// itself keeps running.
    pub fn synchronize_timeout(self, timeout: Duration) -> Self {
        self.barrier(Some(timeout), "synchronize_timeout")
    }

    /// Hands the finished job to a notifier.
    pub fn notify(self, notifier: &Notifier) {
        self.begin("notify");
        notifier.notify(self);
    }

    /// Runs `f` when the last task finished successfully.
    ///
    /// Looks at the current state only; call [`Job::synchronize`] first to
    /// wait for the outcome.
    pub fn on_success(self, f: impl FnOnce(&Job)) -> Self {
        if self.success() {
            f(&self);
        }
        self
    }

    /// Runs `f` when the job is in error or its last task did not succeed.
    pub fn on_failure(self, f: impl FnOnce(&Job)) -> Self {
        if !self.success() {
            f(&self);
        }
        self
    }

    /// Runs `f` unless the job is in error state.
    pub fn inspect(self, f: impl FnOnce(&Job)) -> Self {
        if self.error.is_none() {
            f(&self);
        }
        self
    }

    /// Current backend state of the last task.
    pub fn state(&self) -> JobState {
        match self.last_task() {
            Some((workflow, task)) => workflow.backend().state(&task.handle),
            None => JobState::Undetermined,
        }
    }

    /// State observed by the most recent barrier.
    pub fn last_state(&self) -> Option<JobState> {
        self.last_state
    }

    /// True if the job has no error and its last task is done.
    pub fn success(&self) -> bool {
        self.error.is_none() && self.state() == JobState::Done
    }

    /// Exit code of the last task, when the backend reports one.
    pub fn exit_status(&self) -> Option<i32> {
        self.last_task()
            .and_then(|(workflow, task)| workflow.backend().exit_status(&task.handle))
    }

    /// Backend id of the last task.
    pub fn job_id(&self) -> Option<&str> {
        self.chain.last().map(|task| task.handle.id())
    }

    /// The error that stopped the chain, if any.
    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    pub fn tasks(&self) -> &TaskChain {
        &self.chain
    }

    pub fn workflow(&self) -> Option<&Arc<Workflow>> {
        self.workflow.as_ref()
    }

    fn barrier(mut self, timeout: Option<Duration>, operation: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        self.begin(operation);
        let state = self.wait_for_end_and_state(timeout);
        self.infof(format_args!("{}() finished with state {}", operation, state));
        self.last_state = Some(state);
        self
    }

    fn submit(&mut self, template: JobTemplate) {
        let workflow = match self.workflow.as_ref() {
            Some(workflow) => Arc::clone(workflow),
            None => return self.fail(WorkflowError::NoWorkflow),
        };

        let request = merge_with_default(template, workflow.default_template());
        match workflow.backend().submit(&request) {
            Ok(handle) => {
                self.infof(format_args!("submitted '{}' as job {}", request.display_name(), handle));
                self.chain.push(Task::new(handle, request));
                self.last_state = None;
            }
            Err(source) => self.fail(WorkflowError::Submission {
                command: request.remote_command,
                source,
            }),
        }
    }

    fn fail(&mut self, error: WorkflowError) {
        self.errorf(format_args!("{}", error));
        self.error = Some(error);
    }

    fn wait_for_end_and_state(&self, timeout: Option<Duration>) -> JobState {
        let (workflow, task) = match self.job_check() {
            Ok(found) => found,
            Err(_) => return JobState::Undetermined,
        };

        match workflow.backend().wait_terminated(&task.handle, timeout) {
            Ok(()) => workflow.backend().state(&task.handle),
            Err(BackendError::Timeout(id)) => {
                self.warningf(format_args!("gave up waiting for job {}", id));
                JobState::Undetermined
            }
            Err(e) => {
                self.errorf(format_args!("waiting for job {} failed: {}", task.handle, e));
                JobState::Undetermined
            }
        }
    }

    fn last_task(&self) -> Option<(&Workflow, &Task)> {
        Some((self.workflow.as_deref()?, self.chain.last()?))
    }

    fn job_check(&self) -> Result<(&Workflow, &Task), WorkflowError> {
        let Some(task) = self.chain.last() else {
            self.errorf(format_args!("job_check(): no task in chain"));
            return Err(WorkflowError::TaskNotAvailable);
        };
        let Some(workflow) = self.workflow.as_deref() else {
            return Err(WorkflowError::NoWorkflow);
        };
        Ok((workflow, task))
    }

    fn logger(&self) -> Option<&dyn WorkflowLogger> {
        self.workflow.as_deref().and_then(Workflow::logger)
    }

    fn begin(&self, operation: &str) {
        if let Some(logger) = self.logger() {
            logger.begin(&self.tag, operation);
        }
    }

    fn infof(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = self.logger() {
            logger.info(&self.tag, args);
        }
    }

    fn warningf(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = self.logger() {
            logger.warning(&self.tag, args);
        }
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = self.logger() {
            logger.error(&self.tag, args);
        }
    }
}
