//! Warden: supervision for a single long-running service daemon.
//!
//! Launches the daemon with `--address <addr>`, polls its health endpoint
//! until it is serving with every component loaded, and drives stop, kill,
//! wait and restart.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use warden::prelude::*;
//!
//! # async fn run<C: Connector>(connector: C) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let supervisor = DaemonSupervisor::new();
//! supervisor
//!     .start("/usr/bin/daemon", "unix:///run/daemon.sock", ["--debug"], OutputSink::Null, OutputSink::Null)
//!     .await?;
//! let _client = supervisor.wait_for_start(&connector, Duration::from_secs(30)).await?;
//! supervisor.stop().await?;
//! let _ = supervisor.wait().await;
//! # Ok(())
//! # }
//! ```

pub use warden_core as core;
pub use warden_test as test;

/// Prelude module for common imports.
pub mod prelude {
    pub use warden_core::{
        CancellationToken, ComponentStatus, Connector, DaemonSupervisor, HealthClient,
        OutputSink, ProbeError, Signal, SupervisorConfig, SupervisorError,
    };
}
