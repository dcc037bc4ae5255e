//! Workflow Context
//!
//! Shared configuration every [`Job`](super::Job) is built against: the job
//! backend, the default job template and the logging hooks. A workflow is
//! validated once when built and is read-only afterwards, so one
//! `Arc<Workflow>` can be handed to any number of threads.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::logging::{WorkflowLogger, LOG_HOOKS};
use crate::error::WorkflowError;
use crate::execution::{JobBackend, ProcessBackend};
use crate::template::JobTemplate;

/// Default workflow name.
const DEFAULT_NAME: &str = "workflow";

/// Serializable workflow settings, as found in a flow file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Display name of the workflow
    pub name: String,

    /// Template merged into every submission
    pub defaults: JobTemplate,

    /// Report job operations through the `log` crate
    pub hooks: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            defaults: JobTemplate::default(),
            hooks: true,
        }
    }
}

/// Read-only context shared by all jobs of a workflow session.
pub struct Workflow {
    name: String,
    backend: Arc<dyn JobBackend>,
    default_template: JobTemplate,
    logger: Option<Arc<dyn WorkflowLogger>>,
}

impl Workflow {
    /// Starts building a workflow.
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new()
    }

    /// Workflow running jobs as local processes, logging through `log`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use jobflow::workflow::{Job, Workflow};
    ///
    /// let job = Job::new(&Workflow::process())
    ///     .run("sleep", ["1"])
    ///     .then_run("echo", ["done"])
    ///     .synchronize();
    /// assert!(job.success());
    /// ```
    pub fn process() -> Arc<Workflow> {
        Arc::new(Self {
            name: DEFAULT_NAME.to_string(),
            backend: Arc::new(ProcessBackend::new()),
            default_template: JobTemplate::default(),
            logger: Some(Arc::clone(&*LOG_HOOKS)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &dyn JobBackend {
        self.backend.as_ref()
    }

    /// Template filling the gaps of every submitted request.
    pub fn default_template(&self) -> &JobTemplate {
        &self.default_template
    }

    pub fn logger(&self) -> Option<&dyn WorkflowLogger> {
        self.logger.as_deref()
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("default_template", &self.default_template)
            .field("logging", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder validating a [`Workflow`] before it is shared.
pub struct WorkflowBuilder {
    name: String,
    backend: Option<Arc<dyn JobBackend>>,
    default_template: JobTemplate,
    logger: Option<Arc<dyn WorkflowLogger>>,
}

impl WorkflowBuilder {
    /// Creates a builder with no backend and `log` based hooks.
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            backend: None,
            default_template: JobTemplate::default(),
            logger: Some(Arc::clone(&*LOG_HOOKS)),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the backend jobs are submitted to.
    pub fn backend(self, backend: impl JobBackend + 'static) -> Self {
        self.shared_backend(Arc::new(backend))
    }

    /// Sets a backend that is also used elsewhere.
    pub fn shared_backend(mut self, backend: Arc<dyn JobBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn default_template(mut self, template: JobTemplate) -> Self {
        self.default_template = template;
        self
    }

    /// Replaces the logging hooks.
    pub fn logger(mut self, logger: Arc<dyn WorkflowLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Disables the logging hooks entirely.
    pub fn without_logging(mut self) -> Self {
        self.logger = None;
        self
    }

    /// Applies name, defaults and hook settings from a config.
    pub fn config(mut self, config: &WorkflowConfig) -> Self {
        self.name = config.name.clone();
        self.default_template = config.defaults.clone();
        if !config.hooks {
            self.logger = None;
        } else if self.logger.is_none() {
            self.logger = Some(Arc::clone(&*LOG_HOOKS));
        }
        self
    }

    /// Validates the settings and freezes them into a shared context.
    pub fn build(self) -> Result<Arc<Workflow>, WorkflowError> {
        let backend = self.backend.ok_or(WorkflowError::NoBackend)?;

        Ok(Arc::new(Workflow {
            name: self.name,
            backend,
            default_template: self.default_template,
            logger: self.logger,
        }))
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::fake::FakeBackend;

    #[test]
    fn test_build_requires_backend() {
        let result = Workflow::builder().name("no-backend").build();
        assert_eq!(result.unwrap_err(), WorkflowError::NoBackend);
    }

    #[test]
    fn test_builder_settings() {
        let workflow = Workflow::builder()
            .name("qc")
            .backend(FakeBackend::new())
            .default_template(JobTemplate::default().with_working_directory("/data"))
            .build()
            .unwrap();

        assert_eq!(workflow.name(), "qc");
        assert_eq!(workflow.default_template().working_directory, "/data");
        assert!(workflow.logger().is_some());
    }

    #[test]
    fn test_without_logging() {
        let workflow = Workflow::builder()
            .backend(FakeBackend::new())
            .without_logging()
            .build()
            .unwrap();

        assert!(workflow.logger().is_none());
    }

    #[test]
    fn test_config_applies_settings() {
        let yaml = r#"
name: nightly
hooks: false
defaults:
  job_category: batch
"#;
        let config: WorkflowConfig = serde_yaml::from_str(yaml).unwrap();
        let workflow = Workflow::builder()
            .backend(FakeBackend::new())
            .config(&config)
            .build()
            .unwrap();

        assert_eq!(workflow.name(), "nightly");
        assert_eq!(workflow.default_template().job_category, "batch");
        assert!(workflow.logger().is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config: WorkflowConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert!(config.hooks);
    }

    #[test]
    fn test_process_workflow() {
        let workflow = Workflow::process();
        assert_eq!(workflow.name(), "workflow");
        assert!(workflow.logger().is_some());
    }
}
