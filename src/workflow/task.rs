//! Tasks and Task Chains
//!
//! A [`Task`] is one submitted unit of work. A [`TaskChain`] is the ordered,
//! append-only history of the tasks a job has submitted; its last task is
//! what barriers wait for and what state queries look at.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::execution::JobHandle;
use crate::template::JobTemplate;

/// One submitted unit of work.
#[derive(Serialize, Debug, Clone)]
pub struct Task {
    /// Backend handle of the submitted job
    pub handle: JobHandle,

    /// Command the task was started with
    pub command: String,

    pub args: Vec<String>,

    /// The merged template that was submitted
    #[serde(skip)]
    pub template: JobTemplate,

    /// When the backend accepted the submission
    pub submitted_at: DateTime<Utc>,
}

impl Task {
    pub(crate) fn new(handle: JobHandle, template: JobTemplate) -> Self {
        Self {
            handle,
            command: template.remote_command.clone(),
            args: template.args.clone(),
            template,
            submitted_at: Utc::now(),
        }
    }
}

/// Ordered history of submitted tasks.
///
/// Only jobs append to a chain; callers can read it but not extend it:
///
/// ```compile_fail
/// use jobflow::workflow::{Task, TaskChain};
///
/// fn extend(chain: &mut TaskChain, task: Task) {
///     chain.push(task);
/// }
/// ```
#[derive(Serialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct TaskChain {
    tasks: Vec<Task>,
}

impl TaskChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task; the chain is never reordered.
    pub(crate) fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Most recently appended task, if any.
    pub fn last(&self) -> Option<&Task> {
        self.tasks.last()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }
}

impl<'a> IntoIterator for &'a TaskChain {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
