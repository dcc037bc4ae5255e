//! Job Template Model
//!
//! The submission request handed to a job backend. Every field is optional
//! in the sense that an empty string, `None` or an empty map means "not
//! requested", which lets a partial request be completed from workflow
//! defaults.
//!
//! # Example YAML Format
//!
//! ```yaml
//! working_directory: /data/run
//! output_path: logs/out.txt
//! job_environment:
//!   STAGE: align
//! candidate_machines:
//!   - node01
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A (possibly partial) job submission request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct JobTemplate {
    /// Executable to start
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_command: String,

    /// Arguments passed to the command (never taken from defaults)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Directory the job runs in
    #[serde(skip_serializing_if = "String::is_empty")]
    pub working_directory: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub job_category: String,

    /// File connected to the job's standard input
    #[serde(skip_serializing_if = "String::is_empty")]
    pub input_path: String,

    /// File receiving the job's standard output
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output_path: String,

    /// File receiving the job's standard error
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_path: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub accounting_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub job_name: String,

    /// Hosts the job may be placed on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_machines: Option<Vec<String>>,

    /// Backend specific key/value extensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_list: Option<HashMap<String, String>>,

    /// Files to transfer before the job starts (source -> destination)
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub stage_in_files: HashMap<String, String>,

    /// Environment variables set for the job
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub job_environment: HashMap<String, String>,
}

impl JobTemplate {
    /// Creates a template for running `command` with `args`.
    ///
    /// # Example
    ///
    /// ```
    /// use jobflow::template::JobTemplate;
    ///
    /// let template = JobTemplate::new("sleep", ["1"])
    ///     .with_working_directory("/tmp")
    ///     .with_env("STAGE", "test");
    /// assert_eq!(template.remote_command, "sleep");
    /// assert_eq!(template.args, vec!["1"]);
    /// ```
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remote_command: command.into().trim().to_string(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the working directory.
    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }

    /// Sets the job name.
    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = name.into();
        self
    }

    /// Sets the job category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.job_category = category.into();
        self
    }

    /// Routes standard output to a file.
    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Routes standard error to a file.
    pub fn with_error_path(mut self, path: impl Into<String>) -> Self {
        self.error_path = path.into();
        self
    }

    /// Reads standard input from a file.
    pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
        self.input_path = path.into();
        self
    }

    /// Adds one environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.job_environment.insert(key.into(), value.into());
        self
    }

    /// Restricts placement to the given machines.
    pub fn with_candidate_machines(mut self, machines: Vec<String>) -> Self {
        self.candidate_machines = Some(machines);
        self
    }

    /// Short human readable label: job name if set, else the command line.
    pub fn display_name(&self) -> String {
        if !self.job_name.is_empty() {
            return self.job_name.clone();
        }
        if self.args.is_empty() {
            self.remote_command.clone()
        } else {
            format!("{} {}", self.remote_command, self.args.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_creation() {
        let template = JobTemplate::new(" sleep ", ["2"])
            .with_job_name("nap")
            .with_output_path("out.txt");

        assert_eq!(template.remote_command, "sleep");
        assert_eq!(template.args, vec!["2"]);
        assert_eq!(template.job_name, "nap");
        assert_eq!(template.output_path, "out.txt");
        assert!(template.candidate_machines.is_none());
    }

    #[test]
    fn test_display_name() {
        let template = JobTemplate::new("echo", ["a", "b"]);
        assert_eq!(template.display_name(), "echo a b");

        let named = template.with_job_name("greeting");
        assert_eq!(named.display_name(), "greeting");

        let bare = JobTemplate::new("true", Vec::<String>::new());
        assert_eq!(bare.display_name(), "true");
    }

    #[test]
    fn test_template_from_yaml() {
        let yaml = r#"
working_directory: /data
job_environment:
  STAGE: qc
candidate_machines: []
"#;
        let template: JobTemplate = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(template.working_directory, "/data");
        assert_eq!(template.job_environment.get("STAGE").unwrap(), "qc");
        // present but empty is not the same as absent
        assert_eq!(template.candidate_machines, Some(Vec::new()));
        assert!(template.extension_list.is_none());
    }

    #[test]
    fn test_template_serialization_skips_unset() {
        let template = JobTemplate::new("ls", Vec::<String>::new());
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(json, r#"{"remote_command":"ls"}"#);
    }
}
