//! Job Execution Module
//!
//! Everything that touches running jobs: the backend contract, the local
//! process backend, the completion notifier and the flow engine.
//!
//! # Architecture
//!
//! - [`backend`]: `JobBackend` trait, job handles and states
//! - [`process`]: Backend running jobs as local OS processes
//! - [`notifier`]: Mailbox collecting finished jobs across threads
//! - [`engine`]: Concurrent execution of all jobs in a flow file

pub mod backend;
pub mod engine;
pub mod notifier;
pub mod process;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{JobBackend, JobHandle, JobState};
pub use engine::{Engine, JobReport};
pub use notifier::Notifier;
pub use process::ProcessBackend;
