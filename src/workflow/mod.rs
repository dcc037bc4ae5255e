//! Workflow Composition Module
//!
//! Builds workflow instances out of chained, parallel and synchronized job
//! steps.
//!
//! # Structure
//!
//! - [`context`]: Shared workflow configuration (backend, defaults, hooks)
//! - [`task`]: Submitted tasks and the task chain
//! - [`job`]: The fluent job builder
//! - [`logging`]: Logging hooks called by jobs
//! - [`parser`]: YAML flow files

pub mod context;
pub mod job;
pub mod logging;
pub mod parser;
pub mod task;

pub use context::{Workflow, WorkflowBuilder, WorkflowConfig};
pub use job::Job;
pub use logging::{LogHooks, WorkflowLogger};
pub use parser::{load_flow, parse_flow, FlowFile, JobSpec, StepMode, StepSpec};
pub use task::{Task, TaskChain};
