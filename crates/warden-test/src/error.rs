//! Test error types.

use std::time::Duration;

/// Result type alias for test operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Testing errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// The daemon did not exit within the shutdown grace period.
    #[error("daemon did not exit within {0:?}")]
    Timeout(Duration),

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// Supervisor error.
    #[error("supervisor error: {0}")]
    Supervisor(#[from] warden_core::SupervisorError),

    /// Readiness probe error.
    #[error("readiness error: {0}")]
    Probe(#[from] warden_core::ProbeError),
}

impl TestError {
    /// Returns the probe error, if readiness failed.
    #[must_use]
    pub const fn as_probe(&self) -> Option<&warden_core::ProbeError> {
        match self {
            Self::Probe(e) => Some(e),
            _ => None,
        }
    }
}
