//! Job Templates
//!
//! Submission requests and the merge of per-call requests with workflow
//! defaults.
//!
//! - [`model`]: The [`JobTemplate`] request type
//! - [`merge`]: Default-filling of partial requests

pub mod merge;
pub mod model;

pub use merge::merge_with_default;
pub use model::JobTemplate;
