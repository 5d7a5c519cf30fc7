//! Error types for warden-core.
//!
//! Every failure path returns a classified error naming the step that
//! failed. Nothing is swallowed.

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use crate::platform::{Platform, Signal};

/// Boxed error returned by the health/introspection client seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Error type for process handle and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// A process is already recorded in the slot.
    #[error("daemon is already running")]
    AlreadyRunning,

    /// No process is recorded in the slot.
    #[error("daemon is not running")]
    NotRunning,

    /// The OS refused or failed to create the process.
    #[error("failed to start daemon {program}: {source}")]
    Spawn {
        /// Program that was being launched.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Signal delivery failed.
    #[error("failed to signal daemon with {signal}: {source}")]
    Signal {
        /// Signal that could not be delivered.
        signal: Signal,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The current platform has no way to deliver the requested signal.
    #[error("{signal} is not supported on {platform}")]
    SignalUnsupported {
        /// Signal that was requested.
        signal: Signal,
        /// Current platform.
        platform: Platform,
    },

    /// Waiting on the process failed at the OS level.
    #[error("failed to wait for daemon: {0}")]
    Wait(#[source] std::io::Error),

    /// The process exited unsuccessfully.
    #[error("daemon exited with {0}")]
    Exited(ExitStatus),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (sink preparation and the like).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a spawn error for `program`.
    #[must_use]
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Returns true if the operation was invalid for the current slot state.
    #[must_use]
    pub const fn is_state_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }

    /// Returns true if the caller may retry (or escalate) without changing
    /// anything first.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotRunning | Self::Signal { .. } | Self::SignalUnsupported { .. }
        )
    }

    /// Returns the exit status for [`SupervisorError::Exited`].
    #[must_use]
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Self::Exited(status) => Some(*status),
            _ => None,
        }
    }
}

/// A retryable failure observed while polling for readiness.
#[derive(Debug, thiserror::Error)]
pub enum TransientError {
    /// Could not open a client connection.
    #[error("could not connect to daemon: {0}")]
    Unreachable(#[source] BoxError),

    /// Connected, but the daemon does not report serving yet.
    #[error("connection was successful but service is not available")]
    NotServing(#[source] Option<BoxError>),
}

impl TransientError {
    /// Returns true if the endpoint accepted a connection.
    #[must_use]
    pub const fn connected(&self) -> bool {
        matches!(self, Self::NotServing(_))
    }
}

/// A single component that failed to initialize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load {kind}.{id}: {message}")]
pub struct ComponentLoadError {
    /// Component type identifier.
    pub kind: String,
    /// Component instance identifier.
    pub id: String,
    /// Initialization error message reported by the daemon.
    pub message: String,
}

/// Every fatal component load failure from one introspection response.
///
/// Never empty when constructed through [`ComponentLoadErrors::from_causes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLoadErrors {
    causes: Vec<ComponentLoadError>,
}

impl ComponentLoadErrors {
    /// Builds the aggregate, or `None` when there is nothing to report.
    #[must_use]
    pub fn from_causes(causes: Vec<ComponentLoadError>) -> Option<Self> {
        if causes.is_empty() {
            None
        } else {
            Some(Self { causes })
        }
    }

    /// Returns the individual failures in reporting order.
    #[must_use]
    pub fn causes(&self) -> &[ComponentLoadError] {
        &self.causes
    }

    /// Returns the number of failed components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.causes.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Iterates over the failures.
    pub fn iter(&self) -> std::slice::Iter<'_, ComponentLoadError> {
        self.causes.iter()
    }
}

impl fmt::Display for ComponentLoadErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ComponentLoadErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

impl<'a> IntoIterator for &'a ComponentLoadErrors {
    type Item = &'a ComponentLoadError;
    type IntoIter = std::slice::Iter<'a, ComponentLoadError>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Error type for readiness probing.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// No listen address has been recorded yet.
    #[error("daemon has not been started")]
    NotStarted,

    /// The daemon was serving but the component listing failed.
    #[error("failed to get component list: {0}")]
    Introspection(#[source] BoxError),

    /// One or more components failed to load. Waiting will not help.
    #[error("{0}")]
    ComponentLoad(#[from] ComponentLoadErrors),

    /// The deadline passed before the daemon became ready.
    #[error("deadline exceeded after {timeout:?}{}", describe_last(.last.as_ref()))]
    DeadlineExceeded {
        /// Configured timeout.
        timeout: Duration,
        /// Last transient error observed, if any attempt ran.
        #[source]
        last: Option<TransientError>,
    },

    /// The caller cancelled the probe.
    #[error("readiness probe cancelled{}", describe_last(.last.as_ref()))]
    Cancelled {
        /// Last transient error observed, if any attempt ran.
        #[source]
        last: Option<TransientError>,
    },
}

fn describe_last(last: Option<&TransientError>) -> String {
    last.map(|e| format!(": {e}")).unwrap_or_default()
}

impl ProbeError {
    /// Returns true for failures that polling longer cannot fix.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ComponentLoad(_) | Self::Introspection(_) | Self::NotStarted
        )
    }

    /// Returns true if the deadline or cancellation ended the probe.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. } | Self::Cancelled { .. })
    }

    /// Returns the last transient error wrapped by a timeout, if any.
    #[must_use]
    pub const fn last_transient(&self) -> Option<&TransientError> {
        match self {
            Self::DeadlineExceeded { last, .. } | Self::Cancelled { last } => last.as_ref(),
            _ => None,
        }
    }

    /// Returns the component failures for [`ProbeError::ComponentLoad`].
    #[must_use]
    pub const fn component_errors(&self) -> Option<&ComponentLoadErrors> {
        match self {
            Self::ComponentLoad(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_error(kind: &str, id: &str, message: &str) -> ComponentLoadError {
        ComponentLoadError {
            kind: kind.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_state_conflict_display() {
        assert_eq!(
            SupervisorError::AlreadyRunning.to_string(),
            "daemon is already running"
        );
        assert_eq!(SupervisorError::NotRunning.to_string(), "daemon is not running");
        assert!(SupervisorError::AlreadyRunning.is_state_conflict());
        assert!(SupervisorError::NotRunning.is_state_conflict());
    }

    #[test]
    fn test_spawn_error_names_program() {
        let err = SupervisorError::spawn(
            "daemon-bin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("failed to start daemon"));
        assert!(msg.contains("daemon-bin"));
        assert!(!err.is_state_conflict());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_signal_errors_recoverable() {
        let err = SupervisorError::Signal {
            signal: Signal::Term,
            source: std::io::Error::other("EPERM"),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("SIGTERM"));
    }

    #[test]
    fn test_component_load_errors_join() {
        let errors = ComponentLoadErrors::from_causes(vec![
            load_error("io.containerd.snapshotter.v1", "btrfs", "not a btrfs filesystem"),
            load_error("io.containerd.grpc.v1", "cri", "bad config"),
        ])
        .unwrap();

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.to_string(),
            "failed to load io.containerd.snapshotter.v1.btrfs: not a btrfs filesystem\n\
             failed to load io.containerd.grpc.v1.cri: bad config"
        );
    }

    #[test]
    fn test_component_load_errors_empty_is_none() {
        assert!(ComponentLoadErrors::from_causes(Vec::new()).is_none());
    }

    #[test]
    fn test_deadline_wraps_last_transient() {
        let err = ProbeError::DeadlineExceeded {
            timeout: Duration::from_secs(2),
            last: Some(TransientError::NotServing(None)),
        };
        assert!(err.is_timeout());
        assert!(!err.is_fatal());
        assert!(err.last_transient().is_some_and(TransientError::connected));
        assert!(err.to_string().contains("service is not available"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_deadline_without_attempt() {
        let err = ProbeError::DeadlineExceeded {
            timeout: Duration::from_millis(100),
            last: None,
        };
        assert_eq!(err.to_string(), "deadline exceeded after 100ms");
        assert!(err.last_transient().is_none());
    }

    #[test]
    fn test_component_load_is_fatal() {
        let errors =
            ComponentLoadErrors::from_causes(vec![load_error("t", "i", "boom")]).unwrap();
        let err = ProbeError::from(errors);
        assert!(err.is_fatal());
        assert_eq!(err.component_errors().map(ComponentLoadErrors::len), Some(1));
    }
}
