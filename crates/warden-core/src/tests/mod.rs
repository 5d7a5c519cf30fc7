//! Supervisor test suite.
//!
//! | Module      | Covers |
//! |-------------|--------|
//! | `lifecycle` | start / stop / kill / wait against real child processes |
//! | `probe`     | readiness polling against a scripted endpoint, on a paused clock |
//! | `restart`   | relaunch with the original invocation |
//!
//! Process tests use `/bin/sh` and only run on unix.


pub use mocks::{MockEndpoint, Tick};
