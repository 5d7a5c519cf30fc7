//! Daemon supervisor: one process slot behind one lock.
//!
//! State machine:
//! ```text
//! EMPTY   --start-------------------> RUNNING
//! RUNNING --stop / kill-------------> RUNNING   (signal sent)
//! RUNNING --wait--------------------> EMPTY
//! RUNNING --restart-----------------> RUNNING   (new OS process)
//! RUNNING --restart, relaunch fails-> EMPTY
//! EMPTY   --stop/kill/wait/restart--> NotRunning, no change
//! ```
//!
//! Every mutating operation holds the slot lock for its whole body, so
//! operations are serialized with respect to each other and to state
//! inspection. The listen address lives outside the slot lock so a
//! readiness probe is never stuck behind a blocking `wait`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::SupervisorConfig;
use crate::error::{ProbeError, Result, SupervisorError};
use crate::launch::{LaunchSpec, OutputSink};
use crate::platform::{Platform, Signal, SignalCapabilities};
use crate::probe::{Connector, ReadinessProber};

/// A running child together with the spec that launched it.
struct Process {
    child: Child,
    spec: LaunchSpec,
    pid: Option<u32>,
}

impl Process {
    fn new(child: Child, spec: LaunchSpec) -> Self {
        let pid = child.id();
        Self { child, spec, pid }
    }

    fn signal(&mut self, signal: Signal) -> Result<()> {
        if signal.is_forceful() {
            return self
                .child
                .start_kill()
                .map_err(|source| SupervisorError::Signal { signal, source });
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::kill;
            use nix::unistd::Pid;

            // id() is None once the child has been reaped.
            let pid = self.child.id().ok_or_else(|| SupervisorError::Signal {
                signal,
                source: std::io::Error::other("process already finished"),
            })?;

            kill(Pid::from_raw(pid as i32), signal.as_nix()).map_err(|e| {
                SupervisorError::Signal {
                    signal,
                    source: e.into(),
                }
            })
        }

        #[cfg(not(unix))]
        {
            Err(SupervisorError::SignalUnsupported {
                signal,
                platform: Platform::current(),
            })
        }
    }
}

#[derive(Default)]
struct Slot {
    process: Option<Process>,
    generation: u64,
}

/// Supervises a single daemon process.
///
/// Dropping the supervisor kills a still-recorded child.
pub struct DaemonSupervisor {
    slot: Mutex<Slot>,
    address: RwLock<Option<String>>,
    config: SupervisorConfig,
    capabilities: SignalCapabilities,
}

impl DaemonSupervisor {
    /// Creates an empty supervisor with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SupervisorConfig::default())
    }

    /// Creates an empty supervisor with `config`.
    #[must_use]
    pub fn with_config(config: SupervisorConfig) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            address: RwLock::new(None),
            config,
            capabilities: SignalCapabilities::current(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Returns the signal capabilities in use.
    #[must_use]
    pub const fn capabilities(&self) -> SignalCapabilities {
        self.capabilities
    }

    /// Launches `program` with `args` followed by `<address flag> <address>`.
    ///
    /// Does not wait for readiness; see [`wait_for_start`](Self::wait_for_start).
    ///
    /// # Errors
    /// [`SupervisorError::AlreadyRunning`] if a process is recorded,
    /// [`SupervisorError::Spawn`] if the OS could not create the process.
    pub async fn start<I, S>(
        &self,
        program: impl Into<PathBuf>,
        address: &str,
        args: I,
        stdout: OutputSink,
        stderr: OutputSink,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let spec = LaunchSpec::new(program, args)
            .with_address(&self.config.address_flag, address)
            .with_stdout(stdout)
            .with_stderr(stderr);
        self.start_spec(spec, address).await
    }

    /// Launches the binary, arguments and address from the configuration.
    pub async fn start_configured(&self, stdout: OutputSink, stderr: OutputSink) -> Result<()> {
        self.config.validate_launch()?;
        self.start(
            self.config.binary_path.clone(),
            &self.config.address,
            self.config.args.clone(),
            stdout,
            stderr,
        )
        .await
    }

    /// Launches a fully built spec and records `address` as its endpoint.
    ///
    /// The spec's arguments are used as-is; no address flag is appended.
    pub async fn start_spec(&self, spec: LaunchSpec, address: impl Into<String>) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if slot.process.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let child = spec.spawn()?;
        let process = Process::new(child, spec);
        let address = address.into();

        slot.generation += 1;
        tracing::info!(
            program = %process.spec.program().display(),
            pid = ?process.pid,
            address = %address,
            generation = slot.generation,
            "started daemon"
        );

        *self.address.write() = Some(address);
        slot.process = Some(process);
        Ok(())
    }

    /// Sends the platform's graceful termination signal. Does not wait.
    ///
    /// # Errors
    /// [`SupervisorError::NotRunning`] on an empty slot,
    /// [`SupervisorError::SignalUnsupported`] where no graceful signal exists,
    /// [`SupervisorError::Signal`] if delivery failed.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let process = slot.process.as_mut().ok_or(SupervisorError::NotRunning)?;

        let signal = self
            .capabilities
            .graceful
            .ok_or(SupervisorError::SignalUnsupported {
                signal: Signal::Term,
                platform: Platform::current(),
            })?;

        process.signal(signal)?;
        tracing::info!(pid = ?process.pid, %signal, "stopping daemon");
        Ok(())
    }

    /// Sends the forceful termination signal. Does not wait.
    pub async fn kill(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let process = slot.process.as_mut().ok_or(SupervisorError::NotRunning)?;

        let signal = self.capabilities.forceful;
        process.signal(signal)?;
        tracing::info!(pid = ?process.pid, %signal, "killing daemon");
        Ok(())
    }

    /// Blocks until the process exits, then clears the slot.
    ///
    /// If the returned future is dropped before the process exits, the
    /// process stays recorded.
    ///
    /// # Errors
    /// [`SupervisorError::Exited`] for a non-zero exit or death by signal,
    /// [`SupervisorError::Wait`] if the OS wait failed (the slot is cleared
    /// either way), [`SupervisorError::NotRunning`] on an empty slot.
    pub async fn wait(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let process = slot.process.as_mut().ok_or(SupervisorError::NotRunning)?;

        let pid = process.pid;
        let status = process.child.wait().await;
        slot.process = None;

        match status {
            Ok(status) => {
                tracing::info!(pid = ?pid, %status, "daemon exited");
                exit_result(status)
            }
            Err(e) => {
                tracing::warn!(pid = ?pid, error = %e, "failed to wait for daemon");
                Err(SupervisorError::Wait(e))
            }
        }
    }

    /// Non-blocking exit check. Clears the slot if the process has exited.
    ///
    /// Returns `Ok(None)` while the process is still running.
    pub async fn try_wait(&self) -> Result<Option<ExitStatus>> {
        let mut slot = self.slot.lock().await;
        let process = slot.process.as_mut().ok_or(SupervisorError::NotRunning)?;

        match process.child.try_wait().map_err(SupervisorError::Wait)? {
            Some(status) => {
                tracing::info!(pid = ?process.pid, %status, "daemon exited");
                slot.process = None;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    /// Restarts the daemon with its original invocation.
    ///
    /// Equivalent to [`restart_with`](Self::restart_with) with no callback.
    pub async fn restart(&self) -> Result<()> {
        self.restart_with(|| {}).await
    }

    /// Signals the daemon, blocks until it exits, runs `between`, then
    /// relaunches with the same program, arguments and output sinks.
    ///
    /// `between` runs strictly after the old process exited and before the
    /// new one is spawned. The address is unchanged and readiness is not
    /// re-checked; run the prober again afterwards.
    ///
    /// # Errors
    /// [`SupervisorError::NotRunning`] on an empty slot;
    /// [`SupervisorError::Signal`] if the old process could not be signalled
    /// (slot unchanged); [`SupervisorError::Spawn`] if the relaunch failed
    /// (slot cleared).
    pub async fn restart_with<F>(&self, between: F) -> Result<()>
    where
        F: FnOnce() + Send,
    {
        let mut slot = self.slot.lock().await;
        let process = slot.process.as_mut().ok_or(SupervisorError::NotRunning)?;

        let signal = self.capabilities.restart_signal();
        process.signal(signal)?;

        let old_pid = process.pid;
        match process.child.wait().await {
            Ok(status) => tracing::debug!(pid = ?old_pid, %status, "old daemon exited"),
            Err(e) => tracing::warn!(pid = ?old_pid, error = %e, "failed to reap old daemon"),
        }

        between();

        let spec = process.spec.clone();
        match spec.spawn() {
            Ok(child) => {
                *process = Process::new(child, spec);
                let new_pid = process.pid;
                slot.generation += 1;
                tracing::info!(
                    old_pid = ?old_pid,
                    pid = ?new_pid,
                    generation = slot.generation,
                    "restarted daemon"
                );
                Ok(())
            }
            Err(e) => {
                slot.process = None;
                tracing::warn!(old_pid = ?old_pid, error = %e, "failed to relaunch daemon");
                Err(e)
            }
        }
    }

    /// Returns true if a process is recorded.
    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.process.is_some()
    }

    /// OS process ID of the recorded process.
    pub async fn pid(&self) -> Option<u32> {
        self.slot.lock().await.process.as_ref().and_then(|p| p.pid)
    }

    /// Number of successful launches, including restarts.
    pub async fn generation(&self) -> u64 {
        self.slot.lock().await.generation
    }

    /// Launch spec of the recorded process.
    pub async fn launch_spec(&self) -> Option<LaunchSpec> {
        self.slot
            .lock()
            .await
            .process
            .as_ref()
            .map(|p| p.spec.clone())
    }

    /// Address recorded by the last successful start.
    #[must_use]
    pub fn address(&self) -> Option<String> {
        self.address.read().clone()
    }

    /// Builds a prober for the recorded address using the configured
    /// interval and skip sentinel.
    ///
    /// # Errors
    /// [`ProbeError::NotStarted`] if no start has succeeded yet.
    pub fn prober(&self) -> std::result::Result<ReadinessProber, ProbeError> {
        let address = self.address().ok_or(ProbeError::NotStarted)?;
        Ok(ReadinessProber::new(address)
            .with_interval(self.config.poll_interval)
            .with_skip_sentinel(self.config.skip_sentinel.clone()))
    }

    /// Polls until the daemon is ready or `timeout` passes.
    pub async fn wait_for_start<C: Connector>(
        &self,
        connector: &C,
        timeout: Duration,
    ) -> std::result::Result<C::Client, ProbeError> {
        self.prober()?.wait_ready(connector, timeout).await
    }

    /// Like [`wait_for_start`](Self::wait_for_start), also stopping when
    /// `cancel` fires.
    pub async fn wait_for_start_until<C: Connector>(
        &self,
        connector: &C,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> std::result::Result<C::Client, ProbeError> {
        self.prober()?
            .wait_ready_until(connector, timeout, cancel)
            .await
    }
}

impl Default for DaemonSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn exit_result(status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(SupervisorError::Exited(status))
    }
}
