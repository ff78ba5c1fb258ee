//! End-to-end supervisor tests against real child processes. Unix only:
//! they shell out to /bin/sh and rely on SIGTERM delivery.
#![cfg(unix)]

use std::time::{Duration, Instant};
use svtenc::engine::supervisor::{EncodeJob, JobState, ProcessSupervisor};
use svtenc::engine::LaunchError;

fn sh(script: &str) -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
}

#[test]
fn spawn_failure_leaves_job_pending() {
    let supervisor = ProcessSupervisor::default();
    let job = EncodeJob::new(vec!["/nonexistent/encoder-binary".to_string()]);

    let err = supervisor.launch(&job).unwrap_err();
    assert!(matches!(err, LaunchError::Spawn { .. }));
    assert_eq!(job.state(), JobState::Pending);
    assert_eq!(job.exit_code(), None);
}

#[test]
fn successful_run_reaches_succeeded() {
    let supervisor = ProcessSupervisor::default();
    let job = supervisor.start(sh("exit 0")).unwrap();

    assert_eq!(job.wait(), JobState::Succeeded);
    assert_eq!(job.exit_code(), Some(0));
    assert!(job.failure().is_none());
}

#[test]
fn nonzero_exit_reaches_failed_with_log_tail() {
    let supervisor = ProcessSupervisor::default();
    let job = supervisor
        .start(sh("echo out-line; echo err-line 1>&2; exit 3"))
        .unwrap();

    assert_eq!(job.wait(), JobState::Failed);
    assert_eq!(job.exit_code(), Some(3));

    let failure = job.failure().unwrap();
    assert_eq!(failure.exit_code, Some(3));
    assert!(failure.log_tail.iter().any(|l| l == "out-line"));
    assert!(failure.log_tail.iter().any(|l| l == "err-line"));
}

#[test]
fn subscribe_streams_both_pipes_until_exit() {
    let supervisor = ProcessSupervisor::default();
    let job = supervisor
        .start(sh("echo one; echo two 1>&2; echo three"))
        .unwrap();

    let lines: Vec<String> = job.subscribe().unwrap().collect();
    assert_eq!(job.wait(), JobState::Succeeded);

    assert!(lines.contains(&"one".to_string()));
    assert!(lines.contains(&"two".to_string()));
    assert!(lines.contains(&"three".to_string()));

    // The stream is consumed exactly once.
    assert!(job.subscribe().is_none());
}

#[test]
fn dropped_stream_does_not_block_the_child() {
    let supervisor = ProcessSupervisor::default();
    // Far more output than any pipe buffer holds.
    let job = supervisor
        .start(sh("yes | head -c 200000; exit 0"))
        .unwrap();

    let mut stream = job.subscribe().unwrap();
    let _ = stream.next();
    drop(stream);

    // Readers must keep draining to EOF, or the child would wedge on a
    // full pipe and never exit.
    let started = Instant::now();
    assert_eq!(job.wait(), JobState::Succeeded);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(job.exit_code(), Some(0));
}

#[test]
fn cloned_supervisor_cancels_shared_job() {
    let supervisor = ProcessSupervisor::new(Duration::from_secs(2));
    let job = supervisor.start(sh("sleep 30")).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    supervisor.clone().cancel(&job);
    assert_eq!(job.wait(), JobState::Cancelled);
}

#[test]
fn cancel_terminates_a_long_running_child() {
    let supervisor = ProcessSupervisor::new(Duration::from_secs(2));
    let job = supervisor.start(sh("sleep 30")).unwrap();

    // Give the shell a moment to actually be sleeping.
    std::thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    supervisor.cancel(&job);
    assert_eq!(job.wait(), JobState::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));

    // A signal death carries no exit code.
    assert_eq!(job.exit_code(), None);
    assert!(job.failure().is_none());
}

#[test]
fn cancel_is_idempotent() {
    let supervisor = ProcessSupervisor::new(Duration::from_secs(2));
    let job = supervisor.start(sh("sleep 30")).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    supervisor.cancel(&job);
    supervisor.cancel(&job);
    assert_eq!(job.wait(), JobState::Cancelled);

    // Cancelling a finished job is a no-op too.
    supervisor.cancel(&job);
    assert_eq!(job.state(), JobState::Cancelled);
}

#[test]
fn relaunching_a_job_is_rejected() {
    let supervisor = ProcessSupervisor::default();
    let job = supervisor.start(sh("exit 0")).unwrap();
    job.wait();

    let err = supervisor.launch(&job).unwrap_err();
    assert!(matches!(err, LaunchError::AlreadyLaunched));
}
