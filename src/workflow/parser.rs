//! Flow File Parser
//!
//! Loads a YAML description of several tagged jobs sharing one workflow
//! configuration.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: preprocessing
//! defaults:
//!   working_directory: /data/run
//! jobs:
//!   - tag: A
//!     steps:
//!       - run: sleep
//!         args: ["1"]
//!       - then_run: sleep
//!         args: ["3"]
//!       - run: sleep
//!         args: ["2"]
//!   - tag: B
//!     synchronize: false
//!     steps:
//!       - run: ./index.sh
//!         template:
//!           output_path: index.log
//! ```

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use super::context::{Workflow, WorkflowConfig};
use super::job::Job;
use crate::error::FlowError;
use crate::template::JobTemplate;

/// How a step is attached to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Submitted right away, next to the previous step
    Run,
    /// Submitted once the previous step has ended
    ThenRun,
}

/// Step entry as written in the file.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    run: Option<String>,
    then_run: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    template: Option<JobTemplate>,
}

/// One step of a job.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawStep")]
pub struct StepSpec {
    pub mode: StepMode,
    pub command: String,
    pub args: Vec<String>,
    /// Extra submission settings for this step only
    pub template: JobTemplate,
}

impl TryFrom<RawStep> for StepSpec {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let (mode, command) = match (raw.run, raw.then_run) {
            (Some(command), None) => (StepMode::Run, command),
            (None, Some(command)) => (StepMode::ThenRun, command),
            (Some(_), Some(_)) => return Err("step has both 'run' and 'then_run'".to_string()),
            (None, None) => return Err("step needs either 'run' or 'then_run'".to_string()),
        };
        if command.trim().is_empty() {
            return Err("step command is empty".to_string());
        }

        Ok(Self {
            mode,
            command: command.trim().to_string(),
            args: raw.args,
            template: raw.template.unwrap_or_default(),
        })
    }
}

impl StepSpec {
    /// The partial request submitted for this step.
    pub fn to_template(&self) -> JobTemplate {
        JobTemplate {
            remote_command: self.command.clone(),
            args: self.args.clone(),
            ..self.template.clone()
        }
    }
}

fn default_synchronize() -> bool {
    true
}

/// A tagged chain of steps.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub tag: String,

    pub steps: Vec<StepSpec>,

    /// Wait for the last step before reporting the job
    #[serde(default = "default_synchronize")]
    pub synchronize: bool,
}

impl JobSpec {
    /// Builds and runs the job's chain, blocking on `then_run` steps and
    /// the final barrier.
    pub fn execute(&self, workflow: &Arc<Workflow>) -> Job {
        let mut job = Job::new(workflow).tag_with(self.tag.clone());

        for step in &self.steps {
            let template = step.to_template();
            job = match step.mode {
                StepMode::Run => job.run_with_template(template),
                StepMode::ThenRun => job.then_run_with_template(template),
            };
        }

        if self.synchronize {
            job = job.synchronize();
        }
        job
    }
}

/// Contents of a flow file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FlowFile {
    #[serde(flatten)]
    pub workflow: WorkflowConfig,

    pub jobs: Vec<JobSpec>,
}

/// Parses and validates flow YAML.
pub fn parse_flow(yaml: &str) -> Result<FlowFile, FlowError> {
    let flow: FlowFile = serde_yaml::from_str(yaml)?;
    validate_flow(&flow)?;

    info!(
        "Parsed flow '{}': {} jobs, {} steps",
        flow.workflow.name,
        flow.jobs.len(),
        flow.jobs.iter().map(|j| j.steps.len()).sum::<usize>()
    );
    Ok(flow)
}

/// Loads a flow file from disk.
///
/// # Example
///
/// ```rust,no_run
/// use jobflow::workflow::load_flow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let flow = load_flow("flow.yaml")?;
///     println!("Loaded {} jobs", flow.jobs.len());
///     Ok(())
/// }
/// ```
pub fn load_flow(path: &str) -> Result<FlowFile, FlowError> {
    info!("Loading flow from: {}", path);

    let yaml_content = fs::read_to_string(path).map_err(|source| FlowError::Io {
        path: path.to_string(),
        source,
    })?;
    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    parse_flow(&yaml_content)
}

/// Checks that jobs exist, have steps and carry unique, non-empty tags.
fn validate_flow(flow: &FlowFile) -> Result<(), FlowError> {
    if flow.jobs.is_empty() {
        return Err(FlowError::Invalid("flow defines no jobs".to_string()));
    }

    let mut tags = HashSet::new();
    for job in &flow.jobs {
        if job.tag.trim().is_empty() {
            return Err(FlowError::Invalid("job without tag".to_string()));
        }
        if !tags.insert(job.tag.as_str()) {
            return Err(FlowError::Invalid(format!("duplicate job tag '{}'", job.tag)));
        }
        if job.steps.is_empty() {
            return Err(FlowError::Invalid(format!("job '{}' has no steps", job.tag)));
        }
    }
    Ok(())
}
