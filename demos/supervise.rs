//! Supervises a shell-script daemon through start, readiness, restart and
//! shutdown.
//!
//! The "daemon" signals readiness by creating the file named by its
//! `--address` argument; the connector treats that file as its health
//! endpoint.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example supervise
//! ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use warden::core::BoxError;
use warden::prelude::*;

/// Health endpoint backed by a marker file.
struct MarkerFile;

struct MarkerClient;

#[async_trait]
impl HealthClient for MarkerClient {
    async fn is_serving(&self) -> Result<bool, BoxError> {
        Ok(true)
    }

    async fn components(&self) -> Result<Vec<ComponentStatus>, BoxError> {
        Ok(vec![
            ComponentStatus::loaded("demo.storage.v1", "local"),
            ComponentStatus::failed("demo.storage.v1", "zfs", "zfs is unavailable: skip plugin"),
        ])
    }
}

#[async_trait]
impl Connector for MarkerFile {
    type Client = MarkerClient;

    async fn connect(&self, address: &str) -> Result<MarkerClient, BoxError> {
        tokio::fs::metadata(address).await?;
        Ok(MarkerClient)
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let marker: PathBuf = std::env::temp_dir().join(format!("warden-demo-{}.ready", std::process::id()));
    let address = marker.to_string_lossy().into_owned();
    let _ = std::fs::remove_file(&marker);

    let supervisor = DaemonSupervisor::with_config(
        SupervisorConfig::default().with_startup_timeout(Duration::from_secs(10)),
    );

    supervisor
        .start(
            "/bin/sh",
            &address,
            ["-c", "sleep 1; touch \"$2\"; exec sleep 300", "demo-daemon"],
            OutputSink::Inherit,
            OutputSink::Inherit,
        )
        .await?;
    tracing::info!(pid = ?supervisor.pid().await, "daemon launched");

    supervisor.wait_for_start(&MarkerFile, Duration::from_secs(10)).await?;
    tracing::info!("daemon ready");

    let stale = marker.clone();
    supervisor
        .restart_with(move || {
            let _ = std::fs::remove_file(&stale);
        })
        .await?;
    supervisor.wait_for_start(&MarkerFile, Duration::from_secs(10)).await?;
    tracing::info!(pid = ?supervisor.pid().await, generation = supervisor.generation().await, "daemon restarted");

    supervisor.stop().await?;
    match supervisor.wait().await {
        Ok(()) => tracing::info!("daemon exited cleanly"),
        Err(e) => tracing::info!(error = %e, "daemon stopped"),
    }

    let _ = std::fs::remove_file(&marker);
    Ok(())
}
