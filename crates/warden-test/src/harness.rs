//! Daemon test harness.
//!
//! Wraps a [`DaemonSupervisor`] and a [`Connector`] so a test can launch a
//! daemon, wait until it is ready, and tear it down with escalation.

use std::sync::Arc;
use std::time::Duration;

use warden_core::{Connector, DaemonSupervisor, OutputSink, SupervisorConfig, SupervisorError};

use crate::error::{Result, TestError};
use crate::fixtures::ScriptDaemon;

/// Test harness for a single supervised daemon.
pub struct DaemonTestHarness<C> {
    supervisor: Arc<DaemonSupervisor>,
    connector: C,
    startup_timeout: Duration,
    shutdown_grace: Duration,
    stdout: OutputSink,
    stderr: OutputSink,
}

impl<C: Connector> DaemonTestHarness<C> {
    /// Creates a new test harness builder.
    #[must_use]
    pub fn builder(connector: C) -> DaemonTestHarnessBuilder<C> {
        DaemonTestHarnessBuilder::new(connector)
    }

    /// Starts `daemon` on `address` and waits until it is ready.
    ///
    /// If readiness fails the daemon is torn down before the readiness error
    /// is returned; a failed teardown is logged, not reported.
    pub async fn launch(&self, daemon: &ScriptDaemon, address: &str) -> Result<C::Client> {
        self.supervisor
            .start(
                daemon.program.clone(),
                address,
                daemon.args.clone(),
                self.stdout.clone(),
                self.stderr.clone(),
            )
            .await?;

        match self.wait_ready().await {
            Ok(client) => Ok(client),
            Err(e) => {
                tracing::warn!(address, error = %e, "daemon failed to become ready");
                if let Err(teardown) = self.shutdown().await {
                    tracing::warn!(address, error = %teardown, "failed to tear down daemon");
                }
                Err(e)
            }
        }
    }

    /// Waits for the recorded address to become ready.
    pub async fn wait_ready(&self) -> Result<C::Client> {
        Ok(self
            .supervisor
            .wait_for_start(&self.connector, self.startup_timeout)
            .await?)
    }

    /// Restarts the daemon and waits until the new instance is ready.
    pub async fn restart(&self) -> Result<C::Client> {
        self.supervisor.restart().await?;
        self.wait_ready().await
    }

    /// Stops the daemon, escalating to kill after the grace period.
    ///
    /// A no-op when nothing is running. The exit status is not reported.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(pid) = self.supervisor.pid().await else {
            return Ok(());
        };

        tracing::info!(pid, grace = ?self.shutdown_grace, "initiating graceful shutdown");

        match self.supervisor.stop().await {
            Ok(()) => {
                if let Ok(result) =
                    tokio::time::timeout(self.shutdown_grace, self.supervisor.wait()).await
                {
                    return ignore_exit(result);
                }
                tracing::warn!(pid, "graceful shutdown timed out, killing");
            }
            Err(SupervisorError::NotRunning) => return Ok(()),
            Err(e) => tracing::warn!(pid, error = %e, "stop failed, killing"),
        }

        match self.supervisor.kill().await {
            Ok(()) => {}
            Err(SupervisorError::NotRunning) => return Ok(()),
            Err(e) => return Err(TestError::Shutdown(format!("failed to kill pid {pid}: {e}"))),
        }

        match tokio::time::timeout(self.shutdown_grace, self.supervisor.wait()).await {
            Ok(result) => ignore_exit(result),
            Err(_) => {
                tracing::warn!(pid, "daemon still running after SIGKILL");
                Err(TestError::Timeout(self.shutdown_grace))
            }
        }
    }

    /// The supervisor driving the daemon.
    #[must_use]
    pub fn supervisor(&self) -> &Arc<DaemonSupervisor> {
        &self.supervisor
    }

    /// The connector used for readiness checks.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }
}

/// An unsuccessful exit is the expected outcome of a signal.
fn ignore_exit(result: warden_core::Result<()>) -> Result<()> {
    match result {
        Ok(()) | Err(SupervisorError::Exited(_) | SupervisorError::NotRunning) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Builder for [`DaemonTestHarness`].
pub struct DaemonTestHarnessBuilder<C> {
    connector: C,
    config: SupervisorConfig,
    shutdown_grace: Duration,
    stdout: OutputSink,
    stderr: OutputSink,
}

impl<C: Connector> DaemonTestHarnessBuilder<C> {
    fn new(connector: C) -> Self {
        Self {
            connector,
            config: SupervisorConfig::default().with_startup_timeout(Duration::from_secs(10)),
            shutdown_grace: Duration::from_secs(5),
            stdout: OutputSink::Null,
            stderr: OutputSink::Null,
        }
    }

    /// Sets the supervisor configuration.
    #[must_use]
    pub fn with_config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the readiness polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Sets how long to wait for readiness.
    #[must_use]
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    /// Sets how long to wait after SIGTERM before killing.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Sets the daemon's stdout sink.
    #[must_use]
    pub fn with_stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = sink;
        self
    }

    /// Sets the daemon's stderr sink.
    #[must_use]
    pub fn with_stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = sink;
        self
    }

    /// Builds the harness after validating the configuration.
    pub fn build(self) -> Result<DaemonTestHarness<C>> {
        self.config.validate()?;
        Ok(DaemonTestHarness {
            startup_timeout: self.config.startup_timeout,
            supervisor: Arc::new(DaemonSupervisor::with_config(self.config)),
            connector: self.connector,
            shutdown_grace: self.shutdown_grace,
            stdout: self.stdout,
            stderr: self.stderr,
        })
    }
}
