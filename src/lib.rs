//! jobflow - Fluent Job Orchestration
//!
//! Composes external jobs into workflows: chains of steps that run one
//! after another or side by side, wait at barriers, and report back to a
//! shared collection point when they finish.
//!
//! # Architecture
//!
//! The library is organized into three main modules:
//!
//! - [`template`]: Job submission requests and default merging
//! - [`workflow`]: Workflow context, task chains and the fluent job builder
//! - [`execution`]: Job backends, the completion notifier and the flow engine
//!
//! # Example
//!
//! ```rust,no_run
//! use std::thread;
//! use jobflow::execution::Notifier;
//! use jobflow::workflow::{Job, Workflow};
//!
//! let notifier = Notifier::new();
//! let workflow = Workflow::process();
//!
//! for tag in ["A", "B"] {
//!     let notifier = notifier.clone();
//!     let workflow = workflow.clone();
//!     thread::spawn(move || {
//!         Job::new(&workflow)
//!             .tag_with(tag)
//!             .run("sleep", ["1"])
//!             .then_run("sleep", ["2"])
//!             .run("sleep", ["2"])
//!             .synchronize()
//!             .notify(&notifier);
//!     });
//! }
//!
//! for _ in 0..2 {
//!     println!("finished with sequence: {}", notifier.receive_job().tag());
//! }
//! ```

pub mod error;
pub mod execution;
pub mod template;
pub mod workflow;

// Re-export commonly used types
pub use error::{BackendError, FlowError, WorkflowError};
pub use execution::{Engine, JobBackend, JobState, Notifier, ProcessBackend};
pub use template::JobTemplate;
pub use workflow::{load_flow, Job, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "jobflow";
