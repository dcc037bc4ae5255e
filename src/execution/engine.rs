//! Flow Execution Engine
//!
//! Runs every job of a flow on its own thread against one shared workflow,
//! and collects the finished jobs through a [`Notifier`] in the order they
//! complete.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{error, info, warn};
use serde::Serialize;

use super::backend::{JobBackend, JobState};
use super::notifier::Notifier;
use crate::error::{FlowError, WorkflowError};
use crate::workflow::{FlowFile, Job, JobSpec, TaskChain, Workflow};

/// Outcome of one job, in a form fit for printing or JSON output.
#[derive(Serialize, Debug, Clone)]
pub struct JobReport {
    pub tag: String,
    pub success: bool,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds from engine start until the job reported back
    pub finished_after_ms: u128,
    pub tasks: TaskChain,
}

impl JobReport {
    fn from_job(job: &Job, started: Instant) -> Self {
        Self {
            tag: job.tag().to_string(),
            success: job.success(),
            state: job.state(),
            exit_status: job.exit_status(),
            error: job.last_error().map(|e| e.to_string()),
            finished_after_ms: started.elapsed().as_millis(),
            tasks: job.tasks().clone(),
        }
    }
}

/// Executes the jobs of a flow concurrently.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use jobflow::execution::{Engine, ProcessBackend};
/// use jobflow::workflow::load_flow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let flow = load_flow("flow.yaml")?;
///     let engine = Engine::from_flow(flow, Arc::new(ProcessBackend::new()))?;
///     for report in engine.run() {
///         println!("{}: {}", report.tag, report.state);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Engine {
    workflow: Arc<Workflow>,
    jobs: Vec<JobSpec>,
}

impl Engine {
    pub fn new(workflow: Arc<Workflow>, jobs: Vec<JobSpec>) -> Self {
        Self { workflow, jobs }
    }

    /// Builds the flow's workflow on top of `backend`.
    pub fn from_flow(flow: FlowFile, backend: Arc<dyn JobBackend>) -> Result<Self, FlowError> {
        let workflow = Workflow::builder()
            .shared_backend(backend)
            .config(&flow.workflow)
            .build()?;
        Ok(Self::new(workflow, flow.jobs))
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    /// Runs all jobs and returns their reports in completion order.
    pub fn run(&self) -> Vec<JobReport> {
        let started = Instant::now();
        let notifier = Notifier::new();

        info!(
            "Starting workflow '{}' with {} jobs",
            self.workflow.name(),
            self.jobs.len()
        );

        let workers: Vec<_> = self
            .jobs
            .iter()
            .map(|spec| {
                let spec = spec.clone();
                let workflow = Arc::clone(&self.workflow);
                let notifier = notifier.clone();

                // The collection loop below expects one notification per worker.
                thread::spawn(move || {
                    let job = panic::catch_unwind(AssertUnwindSafe(|| spec.execute(&workflow)))
                        .unwrap_or_else(|payload| {
                            let message = panic_message(payload.as_ref());
                            error!("Worker for job '{}' panicked: {}", spec.tag, message);
                            Job::failed(&workflow, WorkflowError::Aborted(message)).tag_with(spec.tag.clone())
                        });
                    job.notify(&notifier);
                })
            })
            .collect();

        let reports: Vec<JobReport> = (0..self.jobs.len())
            .map(|_| {
                let job = notifier.receive_job();
                let report = JobReport::from_job(&job, started);

                match job.last_error() {
                    Some(e) => error!("Job '{}' stopped: {}", report.tag, e),
                    None if report.success => info!("Job '{}' completed successfully", report.tag),
                    None => warn!("Job '{}' ended in state {}", report.tag, report.state),
                }
                report
            })
            .collect();

        for worker in workers {
            if worker.join().is_err() {
                error!("Job worker thread panicked");
            }
        }

        info!("Workflow finished in {:.2?}", started.elapsed());
        reports
    }
}

/// Text of a panic payload raised by `panic!`.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::fake::FakeBackend;
    use crate::error::BackendError;
    use crate::execution::{JobHandle, ProcessBackend};
    use crate::template::JobTemplate;
    use crate::workflow::parse_flow;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Backend whose submissions panic.
    struct ExplodingBackend;

    impl JobBackend for ExplodingBackend {
        fn submit(&self, _template: &JobTemplate) -> Result<JobHandle, BackendError> {
            panic!("backend exploded");
        }

        fn wait_terminated(&self, _handle: &JobHandle, _timeout: Option<Duration>) -> Result<(), BackendError> {
            Ok(())
        }

        fn state(&self, _handle: &JobHandle) -> JobState {
            JobState::Undetermined
        }
    }

    const FLOW: &str = r#"
name: engine-test
hooks: false
jobs:
  - tag: slow
    steps:
      - run: step1
        args: ["200"]
  - tag: fast
    steps:
      - run: step1
        args: ["0"]
      - then_run: step2
        args: ["10"]
  - tag: broken
    steps:
      - run: reject
      - then_run: never
"#;

    #[test]
    fn test_engine_reports_every_job_in_completion_order() {
        let backend = Arc::new(FakeBackend::new());
        let engine = Engine::from_flow(parse_flow(FLOW).unwrap(), backend.clone()).unwrap();

        let reports = engine.run();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports.last().unwrap().tag, "slow");
        assert!(reports.windows(2).all(|w| w[0].finished_after_ms <= w[1].finished_after_ms));

        let fast = reports.iter().find(|r| r.tag == "fast").unwrap();
        assert!(fast.success);
        assert_eq!(fast.state, JobState::Done);
        assert_eq!(fast.tasks.len(), 2);

        let broken = reports.iter().find(|r| r.tag == "broken").unwrap();
        assert!(!broken.success);
        assert!(broken.error.as_ref().unwrap().contains("reject"));
        assert!(broken.tasks.is_empty());

        // "never" is not submitted after the rejection
        assert_eq!(backend.submission_count(), 3);
    }

    #[test]
    fn test_engine_workflow_uses_flow_config() {
        let engine = Engine::from_flow(parse_flow(FLOW).unwrap(), Arc::new(FakeBackend::new())).unwrap();
        assert_eq!(engine.workflow().name(), "engine-test");
        assert!(engine.workflow().logger().is_none());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let engine = Engine::from_flow(parse_flow(FLOW).unwrap(), Arc::new(FakeBackend::new())).unwrap();
        let reports = engine.run();

        let json = serde_json::to_value(&reports).unwrap();
        let fast = json
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["tag"] == "fast")
            .unwrap();
        assert_eq!(fast["state"], "done");
        assert_eq!(fast["tasks"].as_array().unwrap().len(), 2);
        assert!(fast.get("error").is_none());
    }

    #[test]
    fn test_engine_with_processes() {
        let flow = parse_flow(
            r#"
hooks: false
jobs:
  - tag: A
    steps:
      - run: sleep
        args: ["0.2"]
      - then_run: sh
        args: ["-c", "exit 0"]
      - run: sleep
        args: ["0.1"]
  - tag: B
    steps:
      - run: sh
        args: ["-c", "exit 4"]
"#,
        )
        .unwrap();
        let engine = Engine::from_flow(flow, Arc::new(ProcessBackend::new())).unwrap();

        let reports = engine.run();

        let a = reports.iter().find(|r| r.tag == "A").unwrap();
        assert!(a.success);
        assert_eq!(a.tasks.len(), 3);
        let steps = a.tasks.as_slice();
        assert!(steps[1].submitted_at >= steps[0].submitted_at + chrono::Duration::milliseconds(200));

        let b = reports.iter().find(|r| r.tag == "B").unwrap();
        assert!(!b.success);
        assert_eq!(b.state, JobState::Failed);
        assert_eq!(b.exit_status, Some(4));
        assert!(b.error.is_none());
    }

    #[test]
    fn test_panicking_backend_still_reports_job() {
        let flow = parse_flow(
            r#"
hooks: false
jobs:
  - tag: doomed
    steps:
      - run: step1
"#,
        )
        .unwrap();
        let engine = Engine::from_flow(flow, Arc::new(ExplodingBackend)).unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(engine.run());
        });
        let reports = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("engine did not return after worker panic");

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].tag, "doomed");
        assert!(!reports[0].success);
        assert_eq!(reports[0].error.as_deref(), Some("job aborted: backend exploded"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(payload.as_ref()), "static text");

        let payload: Box<dyn Any + Send> = Box::new(format!("code {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "code 7");

        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "worker panicked");
    }
}
