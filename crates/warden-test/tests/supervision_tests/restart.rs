//! Restart through the harness.

use std::time::Duration;

use warden_core::OutputSink;
use warden_test::{DaemonTestHarness, Response, ScriptDaemon, ScriptedEndpoint};

const ADDRESS: &str = "tcp://127.0.0.1:9100";

#[tokio::test]
async fn restart_relaunches_and_reprobes() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("daemon.log");
    let endpoint = ScriptedEndpoint::healthy_after(1);
    let harness = DaemonTestHarness::builder(endpoint)
        .with_poll_interval(Duration::from_millis(20))
        .with_stdout(OutputSink::create(&log).unwrap())
        .build()
        .unwrap();

    harness.launch(&ScriptDaemon::announcer(), ADDRESS).await.unwrap();
    let supervisor = harness.supervisor();
    let first_pid = supervisor.pid().await.unwrap();
    let first_spec = supervisor.launch_spec().await.unwrap();

    // The new instance refuses once more before serving again.
    harness.connector().push(Response::refused());
    harness.connector().push(Response::healthy());
    let connects_before = harness.connector().connects();

    harness.restart().await.unwrap();

    assert_ne!(supervisor.pid().await.unwrap(), first_pid);
    assert!(supervisor.launch_spec().await.unwrap().same_invocation(&first_spec));
    assert_eq!(supervisor.address().as_deref(), Some(ADDRESS));
    assert_eq!(supervisor.generation().await, 2);
    assert!(harness.connector().connects() > connects_before);

    harness.shutdown().await.unwrap();

    let output = std::fs::read_to_string(&log).unwrap();
    let expected = format!("listening on {ADDRESS}");
    assert!(output.lines().count() <= 2, "{output}");
    assert!(output.lines().all(|l| l == expected), "{output}");
}

#[tokio::test]
async fn restart_callback_runs_between_generations() {
    let harness = DaemonTestHarness::builder(ScriptedEndpoint::healthy_after(0))
        .with_poll_interval(Duration::from_millis(20))
        .build()
        .unwrap();
    harness.launch(&ScriptDaemon::sleeper(), ADDRESS).await.unwrap();

    let supervisor = harness.supervisor();
    let (tx, rx) = tokio::sync::oneshot::channel();
    supervisor
        .restart_with(move || {
            let _ = tx.send(());
        })
        .await
        .unwrap();

    assert!(rx.await.is_ok());
    assert!(supervisor.is_running().await);
    harness.shutdown().await.unwrap();
}
