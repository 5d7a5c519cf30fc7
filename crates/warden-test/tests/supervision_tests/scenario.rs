//! The canonical start / conflict / stop / wait / start sequence.

use std::os::unix::process::ExitStatusExt;
use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};
use warden_core::{DaemonSupervisor, OutputSink, SupervisorError};
use warden_test::ScriptDaemon;

const ADDRESS: &str = "tcp://127.0.0.1:9000";

async fn start(supervisor: &DaemonSupervisor, daemon: &ScriptDaemon) -> warden_core::Result<()> {
    supervisor
        .start(
            daemon.program.clone(),
            ADDRESS,
            daemon.args.clone(),
            OutputSink::Null,
            OutputSink::Null,
        )
        .await
}

#[tokio::test]
async fn start_conflict_stop_wait_start() {
    let supervisor = DaemonSupervisor::new();
    let daemon = ScriptDaemon::sleeper();

    start(&supervisor, &daemon).await.unwrap();
    let first_pid = supervisor.pid().await;

    let err = start(&supervisor, &daemon).await.unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyRunning));
    assert_eq!(supervisor.pid().await, first_pid);

    supervisor.stop().await.unwrap();

    let err = supervisor.wait().await.unwrap_err();
    assert_eq!(err.exit_status().and_then(|s| s.signal()), Some(15));

    start(&supervisor, &daemon).await.unwrap();
    assert_ne!(supervisor.pid().await, first_pid);

    assert_ok!(supervisor.kill().await);
    assert_err!(supervisor.wait().await);
    assert!(!supervisor.is_running().await);
}

#[tokio::test]
async fn clean_exit_waits_without_error() {
    let supervisor = DaemonSupervisor::new();
    assert_ok!(start(&supervisor, &ScriptDaemon::exits_with(0)).await);

    assert_ok!(supervisor.wait().await);
    assert_ok!(start(&supervisor, &ScriptDaemon::exits_with(0)).await);
    assert_ok!(supervisor.wait().await);
    assert_eq!(supervisor.generation().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_starts_record_one_process() {
    let supervisor = Arc::new(DaemonSupervisor::new());
    let daemon = ScriptDaemon::sleeper();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let supervisor = Arc::clone(&supervisor);
            let daemon = daemon.clone();
            tokio::spawn(async move { start(&supervisor, &daemon).await })
        })
        .collect();

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => successes += 1,
            Err(e) => assert!(e.is_state_conflict(), "{e}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(supervisor.generation().await, 1);

    supervisor.kill().await.unwrap();
    let _ = supervisor.wait().await;
}

#[tokio::test]
async fn signals_on_empty_supervisor_are_not_running() {
    let supervisor = DaemonSupervisor::new();
    assert!(matches!(supervisor.stop().await, Err(SupervisorError::NotRunning)));
    assert!(matches!(supervisor.kill().await, Err(SupervisorError::NotRunning)));
    assert!(matches!(supervisor.wait().await, Err(SupervisorError::NotRunning)));
}
