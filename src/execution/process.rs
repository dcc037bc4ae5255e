//! Local Process Backend
//!
//! Runs each submitted template as an OS process on the local machine:
//! - Command and arguments from the template
//! - Working directory and environment variables
//! - Standard input/output/error routed to files when requested
//!
//! A waiter thread per process collects the exit status and wakes everyone
//! blocked in [`JobBackend::wait_terminated`]. Stage-in files and candidate
//! machines have no meaning locally and are ignored.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::backend::{JobBackend, JobHandle, JobState};
use crate::error::BackendError;
use crate::template::JobTemplate;

#[derive(Debug, Clone, Copy)]
struct ProcessStatus {
    state: JobState,
    exit_code: Option<i32>,
}

/// Bookkeeping for one spawned process.
#[derive(Debug)]
struct TrackedProcess {
    status: Mutex<ProcessStatus>,
    finished: Condvar,
}

impl TrackedProcess {
    fn running() -> Self {
        Self {
            status: Mutex::new(ProcessStatus {
                state: JobState::Running,
                exit_code: None,
            }),
            finished: Condvar::new(),
        }
    }

    fn status(&self) -> MutexGuard<'_, ProcessStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, id: &str, result: std::io::Result<ExitStatus>) {
        let (state, exit_code) = match result {
            Ok(status) if status.success() => (JobState::Done, status.code()),
            Ok(status) => (JobState::Failed, status.code()),
            Err(e) => {
                warn!("Lost track of process job {}: {}", id, e);
                (JobState::Undetermined, None)
            }
        };
        debug!("Process job {} finished: {} (exit code {:?})", id, state, exit_code);

        *self.status() = ProcessStatus { state, exit_code };
        self.finished.notify_all();
    }
}

/// Backend executing jobs as local OS processes.
///
/// Finished processes stay tracked so their state and exit status can be
/// queried at any time. Long-lived backends drop them with
/// [`ProcessBackend::release`].
///
/// # Example
///
/// ```rust,no_run
/// use jobflow::execution::{JobBackend, ProcessBackend};
/// use jobflow::template::JobTemplate;
///
/// let backend = ProcessBackend::new();
/// let handle = backend.submit(&JobTemplate::new("sleep", ["1"])).unwrap();
/// backend.wait_terminated(&handle, None).unwrap();
/// println!("{}", backend.state(&handle));
/// ```
#[derive(Debug, Default)]
pub struct ProcessBackend {
    next_id: AtomicU64,
    processes: Mutex<HashMap<String, Arc<TrackedProcess>>>,
}

impl ProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops tracking a finished job. Returns false for unknown or running jobs.
    ///
    /// Afterwards the handle reads as an unknown job.
    pub fn release(&self, handle: &JobHandle) -> bool {
        let mut processes = self.processes();
        let finished = processes
            .get(handle.id())
            .map_or(false, |tracked| tracked.status().state.is_terminal());
        if finished {
            processes.remove(handle.id());
            debug!("Released process job {}", handle.id());
        }
        finished
    }

    /// Number of jobs currently tracked.
    pub fn tracked(&self) -> usize {
        self.processes().len()
    }

    fn processes(&self) -> MutexGuard<'_, HashMap<String, Arc<TrackedProcess>>> {
        self.processes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, handle: &JobHandle) -> Result<Arc<TrackedProcess>, BackendError> {
        self.processes()
            .get(handle.id())
            .cloned()
            .ok_or_else(|| BackendError::UnknownJob(handle.id().to_string()))
    }

    fn build_command(template: &JobTemplate) -> Result<Command, BackendError> {
        let spawn_error = |e: std::io::Error| BackendError::Spawn {
            command: template.remote_command.clone(),
            message: e.to_string(),
        };

        let working_dir = if template.working_directory.is_empty() {
            None
        } else {
            Some(PathBuf::from(&template.working_directory))
        };

        let mut cmd = Command::new(&template.remote_command);
        cmd.args(&template.args).envs(&template.job_environment);

        if let Some(ref dir) = working_dir {
            cmd.current_dir(dir);
            debug!("Executing in directory: {}", dir.display());
        }

        if !template.input_path.is_empty() {
            let file = File::open(resolve(&template.input_path, &working_dir)).map_err(spawn_error)?;
            cmd.stdin(file);
        }

        let stdout = open_output(&template.output_path, &working_dir).map_err(spawn_error)?;
        let stderr = match stdout {
            Some(ref file) if same_destination(template, &working_dir) => {
                Some(file.try_clone().map_err(spawn_error)?)
            }
            _ => open_output(&template.error_path, &working_dir).map_err(spawn_error)?,
        };
        cmd.stdout(to_stdio(stdout));
        cmd.stderr(to_stdio(stderr));

        Ok(cmd)
    }
}

impl JobBackend for ProcessBackend {
    fn submit(&self, template: &JobTemplate) -> Result<JobHandle, BackendError> {
        if template.remote_command.is_empty() {
            return Err(BackendError::InvalidTemplate("no remote command given".to_string()));
        }

        let mut child = Self::build_command(template)?
            .spawn()
            .map_err(|e| BackendError::Spawn {
                command: template.remote_command.clone(),
                message: e.to_string(),
            })?;

        let id = (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let tracked = Arc::new(TrackedProcess::running());
        self.processes().insert(id.clone(), Arc::clone(&tracked));

        debug!(
            "Started process job {} (pid {}): {}",
            id,
            child.id(),
            template.display_name()
        );

        let waiter_id = id.clone();
        thread::spawn(move || {
            let result = child.wait();
            tracked.finish(&waiter_id, result);
        });

        Ok(JobHandle::new(id))
    }

    fn wait_terminated(&self, handle: &JobHandle, timeout: Option<Duration>) -> Result<(), BackendError> {
        let tracked = self.lookup(handle)?;
        let status = tracked.status();

        match timeout {
            None => {
                let _status = tracked
                    .finished
                    .wait_while(status, |s| !s.state.is_terminal())
                    .unwrap_or_else(PoisonError::into_inner);
                Ok(())
            }
            Some(limit) => {
                let (_status, result) = tracked
                    .finished
                    .wait_timeout_while(status, limit, |s| !s.state.is_terminal())
                    .unwrap_or_else(PoisonError::into_inner);
                if result.timed_out() {
                    Err(BackendError::Timeout(handle.id().to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn state(&self, handle: &JobHandle) -> JobState {
        match self.lookup(handle) {
            Ok(tracked) => tracked.status().state,
            Err(_) => JobState::Undetermined,
        }
    }

    fn exit_status(&self, handle: &JobHandle) -> Option<i32> {
        self.lookup(handle).ok().and_then(|tracked| tracked.status().exit_code)
    }
}

/// Resolves a template path against the job's working directory.
fn resolve(path: &str, working_dir: &Option<PathBuf>) -> PathBuf {
    match working_dir {
        Some(dir) if Path::new(path).is_relative() => dir.join(path),
        _ => PathBuf::from(path),
    }
}

/// True when stdout and stderr are routed to the same file.
fn same_destination(template: &JobTemplate, working_dir: &Option<PathBuf>) -> bool {
    !template.output_path.is_empty()
        && resolve(&template.output_path, working_dir) == resolve(&template.error_path, working_dir)
}

/// Unset destinations inherit the stream of the current process.
fn to_stdio(file: Option<File>) -> Stdio {
    file.map_or_else(Stdio::inherit, Stdio::from)
}

/// Opens the destination of an output stream, creating parent directories.
fn open_output(path: &str, working_dir: &Option<PathBuf>) -> std::io::Result<Option<File>> {
    if path.is_empty() {
        return Ok(None);
    }

    let output_path = resolve(path, working_dir);
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            debug!("Created directory: {}", parent.display());
        }
    }

    File::create(&output_path).map(Some)
}
