//! Workflow Logging Hooks
//!
//! Jobs report the operations they perform through a [`WorkflowLogger`]
//! attached to their workflow. Hooks only observe: they are never consulted
//! for control flow, and a workflow without a logger simply skips them.

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;

/// Receives progress reports from jobs.
///
/// `tag` is the correlation tag of the reporting job (possibly empty).
pub trait WorkflowLogger: Send + Sync {
    /// Called on entry of a chaining operation.
    fn begin(&self, tag: &str, operation: &str);

    fn info(&self, tag: &str, args: fmt::Arguments<'_>);

    fn warning(&self, tag: &str, args: fmt::Arguments<'_>);

    fn error(&self, tag: &str, args: fmt::Arguments<'_>);
}

/// Logger forwarding hook calls to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHooks;

/// Shared instance used by workflows built with logging enabled.
pub static LOG_HOOKS: Lazy<Arc<dyn WorkflowLogger>> = Lazy::new(|| Arc::new(LogHooks));

fn prefix(tag: &str) -> String {
    if tag.is_empty() {
        String::from("[job]")
    } else {
        format!("[job {}]", tag)
    }
}

impl WorkflowLogger for LogHooks {
    fn begin(&self, tag: &str, operation: &str) {
        debug!("{} {}()", prefix(tag), operation);
    }

    fn info(&self, tag: &str, args: fmt::Arguments<'_>) {
        info!("{} {}", prefix(tag), args);
    }

    fn warning(&self, tag: &str, args: fmt::Arguments<'_>) {
        warn!("{} {}", prefix(tag), args);
    }

    fn error(&self, tag: &str, args: fmt::Arguments<'_>) {
        error!("{} {}", prefix(tag), args);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(prefix(""), "[job]");
        assert_eq!(prefix("A"), "[job A]");
    }

    #[test]
    fn test_log_hooks_do_not_panic_without_logger_installed() {
        LOG_HOOKS.begin("A", "run");
        LOG_HOOKS.info("A", format_args!("submitted {}", 1));
        LOG_HOOKS.warning("", format_args!("slow"));
        LOG_HOOKS.error("B", format_args!("failed"));
    }
}
