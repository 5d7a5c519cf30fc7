//! Readiness through the harness and supervisor.

use std::time::Duration;

use warden_core::{CancellationToken, ProbeError, TransientError};
use warden_test::{DaemonTestHarness, Response, ScriptDaemon, ScriptedEndpoint};

const ADDRESS: &str = "unix:///run/warden-test/daemon.sock";

fn harness(endpoint: ScriptedEndpoint, timeout: Duration) -> DaemonTestHarness<ScriptedEndpoint> {
    DaemonTestHarness::builder(endpoint)
        .with_poll_interval(Duration::from_millis(20))
        .with_startup_timeout(timeout)
        .with_shutdown_grace(Duration::from_secs(1))
        .build()
        .unwrap()
}

#[tokio::test]
async fn probes_recorded_address_until_serving() {
    let endpoint = ScriptedEndpoint::new()
        .then_repeat(Response::refused(), 2)
        .then(Response::NotServing)
        .then(Response::Serving(vec![
            warden_core::ComponentStatus::loaded("io.containerd.content.v1", "content"),
        ]));
    let harness = harness(endpoint, Duration::from_secs(5));

    let client = harness.launch(&ScriptDaemon::sleeper(), ADDRESS).await.unwrap();

    let endpoint = harness.connector();
    assert_eq!(endpoint.connects(), 4);
    assert!(endpoint.addresses().iter().all(|a| a == ADDRESS));
    assert_eq!(endpoint.open_clients(), 1);
    drop(client);
    assert_eq!(endpoint.open_clients(), 0);

    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn skipped_component_is_ready() {
    let endpoint = ScriptedEndpoint::new().then(Response::skipped("io.containerd.snapshotter.v1", "zfs"));
    let harness = harness(endpoint, Duration::from_secs(5));

    harness.launch(&ScriptDaemon::sleeper(), ADDRESS).await.unwrap();
    harness.shutdown().await.unwrap();
}

#[tokio::test]
async fn load_failure_is_reported_without_waiting_out_deadline() {
    let endpoint = ScriptedEndpoint::new()
        .then(Response::refused())
        .then(Response::load_failure("io.containerd.grpc.v1", "cri", "invalid config"));
    let harness = harness(endpoint, Duration::from_secs(60));

    let started = std::time::Instant::now();
    let err = harness
        .launch(&ScriptDaemon::sleeper(), ADDRESS)
        .await
        .err()
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    let probe = err.as_probe().unwrap();
    assert!(probe.is_fatal());
    assert_eq!(
        probe.to_string(),
        "failed to load io.containerd.grpc.v1.cri: invalid config"
    );
    assert_eq!(harness.connector().connects(), 2);
    assert!(!harness.supervisor().is_running().await);
}

#[tokio::test]
async fn deadline_reports_last_transient_error() {
    let endpoint = ScriptedEndpoint::new().then(Response::ServingError("rpc error: code = Unavailable".into()));
    let harness = harness(endpoint, Duration::from_millis(200));

    let err = harness
        .launch(&ScriptDaemon::sleeper(), ADDRESS)
        .await
        .err()
        .unwrap();

    let probe = err.as_probe().unwrap();
    assert!(matches!(probe, ProbeError::DeadlineExceeded { .. }));
    assert!(matches!(
        probe.last_transient(),
        Some(TransientError::NotServing(Some(_)))
    ));
    assert!(!harness.supervisor().is_running().await);
}

#[tokio::test]
async fn cancelled_probe_leaves_daemon_running() {
    let harness = harness(ScriptedEndpoint::new(), Duration::from_secs(60));
    let daemon = ScriptDaemon::sleeper();
    harness
        .supervisor()
        .start(
            daemon.program,
            ADDRESS,
            daemon.args,
            warden_core::OutputSink::Null,
            warden_core::OutputSink::Null,
        )
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = harness
        .supervisor()
        .wait_for_start_until(harness.connector(), Duration::from_secs(60), &cancel)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ProbeError::Cancelled { .. }));
    assert!(harness.supervisor().is_running().await);
    harness.shutdown().await.unwrap();
}
