//! End-to-end supervision tests, grouped by concern.

mod readiness;
mod restart;
mod scenario;
