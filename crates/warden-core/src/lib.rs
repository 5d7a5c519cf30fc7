// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # warden-core
//!
//! Supervision primitives for a single long-running service daemon:
//!
//! - [`DaemonSupervisor`]: the process slot, launcher and lifecycle control
//!   (start, stop, kill, wait, restart)
//! - [`ReadinessProber`]: polls the daemon's health endpoint until it is
//!   serving with every component loaded
//! - [`SupervisorConfig`]: TOML-loadable defaults
//! - [`ConfigPayload`]: the opaque configuration message the daemon consumes
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use warden_core::{DaemonSupervisor, OutputSink};
//!
//! let supervisor = DaemonSupervisor::new();
//! supervisor
//!     .start("containerd", "/run/test/containerd.sock", ["--log-level", "debug"],
//!            OutputSink::Inherit, OutputSink::Inherit)
//!     .await?;
//! let client = supervisor.wait_for_start(&connector, Duration::from_secs(30)).await?;
//! supervisor.stop().await?;
//! supervisor.wait().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Lock guards deliberately span the whole operation
#![allow(clippy::significant_drop_tightening)]

pub mod config;
pub mod error;
pub mod launch;
pub mod payload;
pub mod platform;
pub mod probe;
pub mod supervisor;
#[cfg(test)]
pub mod tests;

pub use config::SupervisorConfig;
pub use error::{
    BoxError, ComponentLoadError, ComponentLoadErrors, ProbeError, Result, SupervisorError,
    TransientError,
};
pub use launch::{DEFAULT_ADDRESS_FLAG, LaunchSpec, OutputSink};
pub use payload::{ConfigPayload, PayloadSource};
pub use platform::{Platform, Signal, SignalCapabilities};
pub use probe::{
    ComponentStatus, Connector, DEFAULT_POLL_INTERVAL, DEFAULT_SKIP_SENTINEL, HealthClient,
    InitError, ReadinessProber, check_components,
};
pub use supervisor::DaemonSupervisor;
pub use tokio_util::sync::CancellationToken;
