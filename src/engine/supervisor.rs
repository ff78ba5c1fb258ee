//! Launches the external encoder and supervises it until a terminal state.
//!
//! One OS process per job. The supervisor owns the only writer to the job
//! state; everyone else holds cloned read handles. Output is captured
//! incrementally, line by line, never buffered whole — encodes can run for
//! hours and callers need live progress.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{EncodeFailure, LaunchError};

/// Lines of combined output kept for failure reporting.
const LOG_TAIL_LINES: usize = 40;

/// Lifecycle of one supervised encode.
///
/// Pending -> Running -> Succeeded | Failed | Cancelled.
/// Terminal states accept no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

#[derive(Debug)]
struct JobInner {
    state: JobState,
    exit_code: Option<i32>,
    child_pid: Option<u32>,
    cancel_requested: bool,
    log_tail: VecDeque<String>,
    /// Live stream; taken by the first subscriber.
    log_rx: Option<Receiver<String>>,
}

#[derive(Debug)]
struct JobShared {
    inner: Mutex<JobInner>,
    state_changed: Condvar,
}

/// Handle to one supervised run of the external encoder, from launch to
/// terminal state. Cloning is cheap; all clones observe the same job.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub id: Uuid,
    command: Arc<Vec<String>>,
    shared: Arc<JobShared>,
}

impl EncodeJob {
    /// Create a Pending job for an already-built command.
    pub fn new(command: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            command: Arc::new(command),
            shared: Arc::new(JobShared {
                inner: Mutex::new(JobInner {
                    state: JobState::Pending,
                    exit_code: None,
                    child_pid: None,
                    cancel_requested: false,
                    log_tail: VecDeque::with_capacity(LOG_TAIL_LINES),
                    log_rx: None,
                }),
                state_changed: Condvar::new(),
            }),
        }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn state(&self) -> JobState {
        self.shared.inner.lock().unwrap().state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.shared.inner.lock().unwrap().exit_code
    }

    /// Snapshot of the most recent output lines. Any number of readers
    /// may poll this without consuming the live stream.
    pub fn log_tail(&self) -> Vec<String> {
        self.shared
            .inner
            .lock()
            .unwrap()
            .log_tail
            .iter()
            .cloned()
            .collect()
    }

    /// Take the live log-line stream. Yields incrementally until the job
    /// reaches a terminal state; can be taken exactly once and is not
    /// restartable. Returns None if already taken or never launched.
    pub fn subscribe(&self) -> Option<LogStream> {
        self.shared
            .inner
            .lock()
            .unwrap()
            .log_rx
            .take()
            .map(|rx| LogStream { rx })
    }

    /// Block until the job reaches a terminal state.
    pub fn wait(&self) -> JobState {
        let mut inner = self.shared.inner.lock().unwrap();
        while !inner.state.is_terminal() {
            inner = self.shared.state_changed.wait(inner).unwrap();
        }
        inner.state
    }

    /// For a Failed job, the exit code and log tail; None otherwise.
    pub fn failure(&self) -> Option<EncodeFailure> {
        let inner = self.shared.inner.lock().unwrap();
        if inner.state != JobState::Failed {
            return None;
        }
        Some(EncodeFailure {
            exit_code: inner.exit_code,
            log_tail: inner.log_tail.iter().cloned().collect(),
        })
    }
}

/// Blocking iterator over the combined stdout/stderr of the child.
pub struct LogStream {
    rx: Receiver<String>,
}

impl Iterator for LogStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.rx.recv().ok()
    }
}

/// Spawns encoder processes and drives their state machines. Cloning
/// shares nothing but the grace period; jobs carry their own state.
#[derive(Clone)]
pub struct ProcessSupervisor {
    /// How long a cancelled child gets to exit on SIGTERM before SIGKILL.
    grace_period: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl ProcessSupervisor {
    pub fn new(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    /// Build a Pending job and launch it immediately.
    pub fn start(&self, command: Vec<String>) -> Result<EncodeJob, LaunchError> {
        let job = EncodeJob::new(command);
        self.launch(&job)?;
        Ok(job)
    }

    /// Spawn the encoder process for a Pending job.
    ///
    /// On any spawn failure the job stays Pending and never transitions
    /// to Running. On success the job is Running and a waiter thread owns
    /// the child until it exits.
    pub fn launch(&self, job: &EncodeJob) -> Result<(), LaunchError> {
        let (binary, args) = match job.command().split_first() {
            Some(split) => split,
            None => return Err(LaunchError::EmptyCommand),
        };

        let mut inner = job.shared.inner.lock().unwrap();
        if inner.state != JobState::Pending || inner.log_rx.is_some() {
            return Err(LaunchError::AlreadyLaunched);
        }

        let mut cmd = Command::new(binary);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            binary: binary.clone(),
            source,
        })?;

        debug!(job = %job.id, pid = child.id(), "encoder spawned");

        let (tx, rx) = mpsc::channel();
        inner.state = JobState::Running;
        inner.child_pid = Some(child.id());
        inner.log_rx = Some(rx);
        drop(inner);
        job.shared.state_changed.notify_all();

        // One reader per pipe; both feed the same channel so the caller
        // sees a single interleaved line stream.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = stdout.map(|pipe| spawn_pipe_reader(pipe, tx.clone(), job.clone()));
        let err_reader = stderr.map(|pipe| spawn_pipe_reader(pipe, tx, job.clone()));

        let shared = job.shared.clone();
        let job_id = job.id;
        thread::spawn(move || {
            let status = child.wait();

            // Drain readers before publishing the terminal state so the
            // log stream is complete when wait() returns.
            if let Some(t) = out_reader {
                let _ = t.join();
            }
            if let Some(t) = err_reader {
                let _ = t.join();
            }

            let mut inner = shared.inner.lock().unwrap();
            inner.child_pid = None;
            match status {
                Ok(status) => {
                    inner.exit_code = status.code();
                    inner.state = if inner.cancel_requested {
                        JobState::Cancelled
                    } else if status.success() {
                        JobState::Succeeded
                    } else {
                        JobState::Failed
                    };
                    debug!(job = %job_id, state = ?inner.state, code = ?inner.exit_code, "encoder exited");
                }
                Err(e) => {
                    warn!(job = %job_id, error = %e, "failed to reap encoder");
                    inner.state = if inner.cancel_requested {
                        JobState::Cancelled
                    } else {
                        JobState::Failed
                    };
                }
            }
            drop(inner);
            shared.state_changed.notify_all();
        });

        Ok(())
    }

    /// Request cancellation. Safe at any point after job creation and
    /// idempotent: cancelling a Pending or terminal job, or one already
    /// being cancelled, is a no-op.
    ///
    /// The child first gets a terminate signal; if it has not exited
    /// after the grace period it is killed. The state transition to
    /// Cancelled happens once the child is actually reaped.
    pub fn cancel(&self, job: &EncodeJob) {
        let pid = {
            let mut inner = job.shared.inner.lock().unwrap();
            if inner.state != JobState::Running || inner.cancel_requested {
                return;
            }
            inner.cancel_requested = true;
            inner.child_pid
        };

        let Some(pid) = pid else { return };
        debug!(job = %job.id, pid, "cancel requested");
        terminate(pid);

        let shared = job.shared.clone();
        let grace = self.grace_period;
        thread::spawn(move || {
            let inner = shared.inner.lock().unwrap();
            let (inner, timeout) = shared
                .state_changed
                .wait_timeout_while(inner, grace, |inner| !inner.state.is_terminal())
                .unwrap();
            if timeout.timed_out() && !inner.state.is_terminal() {
                warn!(pid, "grace period expired, killing encoder");
                kill(pid);
            }
        });
    }
}

fn spawn_pipe_reader<R: std::io::Read + Send + 'static>(
    pipe: R,
    tx: Sender<String>,
    job: EncodeJob,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let reader = BufReader::new(pipe);
        for line in reader.lines().map_while(Result::ok) {
            {
                let mut inner = job.shared.inner.lock().unwrap();
                if inner.log_tail.len() == LOG_TAIL_LINES {
                    inner.log_tail.pop_front();
                }
                inner.log_tail.push_back(line.clone());
            }
            // An abandoned subscription drops the receiver; keep draining
            // to EOF anyway so the child never blocks on a full pipe.
            let _ = tx.send(line);
        }
    })
}

#[cfg(unix)]
fn terminate(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(unix)]
fn kill(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
}

// No graceful terminate on non-unix; go straight to TerminateProcess
// semantics via taskkill.
#[cfg(not(unix))]
fn terminate(pid: u32) {
    kill(pid);
}

#[cfg(not(unix))]
fn kill(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .output();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_starts_pending() {
        let job = EncodeJob::new(vec!["ffmpeg".to_string()]);
        assert_eq!(job.state(), JobState::Pending);
        assert_eq!(job.exit_code(), None);
        assert!(job.log_tail().is_empty());
    }

    #[test]
    fn test_empty_command_is_launch_error() {
        let supervisor = ProcessSupervisor::default();
        let err = supervisor.start(Vec::new()).unwrap_err();
        assert!(matches!(err, LaunchError::EmptyCommand));
    }

    #[test]
    fn test_terminal_state_detection() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_cancel_on_pending_job_is_noop() {
        let supervisor = ProcessSupervisor::default();
        let job = EncodeJob::new(vec!["ffmpeg".to_string()]);
        supervisor.cancel(&job);
        assert_eq!(job.state(), JobState::Pending);
    }
}
