// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # warden-test
//!
//! Testing infrastructure for code that supervises daemons with Warden.
//!
//! This crate provides:
//! - **Scripted endpoint**: a fake health/introspection endpoint that replays
//!   a script of responses, one per connection attempt
//! - **Fixtures**: `/bin/sh` stand-ins for real daemons
//! - **Test harness**: launch, wait for readiness, tear down with escalation
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_test::{DaemonTestHarness, Response, ScriptDaemon, ScriptedEndpoint};
//!
//! let endpoint = ScriptedEndpoint::healthy_after(3);
//! let harness = DaemonTestHarness::builder(endpoint).build()?;
//!
//! let client = harness.launch(&ScriptDaemon::sleeper(), "tcp://127.0.0.1:9000").await?;
//! harness.shutdown().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod endpoint;
pub mod error;
pub mod fixtures;
pub mod harness;

pub use endpoint::{Response, ScriptedClient, ScriptedEndpoint};
pub use error::{Result, TestError};
pub use fixtures::ScriptDaemon;
pub use harness::{DaemonTestHarness, DaemonTestHarnessBuilder};
