//! Platform signal capabilities.
//!
//! Termination strategy is a small table keyed by target family and
//! resolved once at build time. Unix delivers SIGTERM for graceful
//! shutdown; Windows has no graceful equivalent for console-less children,
//! so only the forceful path exists there.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Target family the supervisor was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Linux, macOS and other Unix-likes.
    Unix,
    /// Windows.
    Windows,
    /// Anything else.
    Other,
}

impl Platform {
    /// Returns the platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(unix) {
            Self::Unix
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }

    /// Returns the platform name as a static string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::Windows => "windows",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Termination signals the supervisor can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Terminate (graceful shutdown).
    Term,
    /// Interrupt (graceful shutdown).
    Int,
    /// Kill (immediate termination).
    Kill,
}

impl Signal {
    /// Returns true if the signal cannot be caught by the daemon.
    #[must_use]
    pub const fn is_forceful(&self) -> bool {
        matches!(self, Self::Kill)
    }

    /// Returns the conventional signal name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Term => "SIGTERM",
            Self::Int => "SIGINT",
            Self::Kill => "SIGKILL",
        }
    }

    #[cfg(unix)]
    pub(crate) const fn as_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal as NixSignal;

        match self {
            Self::Term => NixSignal::SIGTERM,
            Self::Int => NixSignal::SIGINT,
            Self::Kill => NixSignal::SIGKILL,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which termination signals the current platform can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalCapabilities {
    /// Graceful signal, if the platform has one.
    pub graceful: Option<Signal>,
    /// Forceful signal; always available.
    pub forceful: Signal,
}

impl SignalCapabilities {
    /// Capabilities of the platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        Self::for_platform(Platform::current())
    }

    /// Capability table entry for `platform`.
    #[must_use]
    pub const fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Unix => Self {
                graceful: Some(Signal::Term),
                forceful: Signal::Kill,
            },
            Platform::Windows | Platform::Other => Self {
                graceful: None,
                forceful: Signal::Kill,
            },
        }
    }

    /// Signal used to bring down the old process during a restart.
    #[must_use]
    pub const fn restart_signal(&self) -> Signal {
        match self.graceful {
            Some(signal) => signal,
            None => self.forceful,
        }
    }

    /// Returns true if `signal` can be delivered here.
    #[must_use]
    pub const fn supports(&self, signal: Signal) -> bool {
        match signal {
            Signal::Kill => true,
            Signal::Term | Signal::Int => self.graceful.is_some(),
        }
    }
}

impl Default for SignalCapabilities {
    fn default() -> Self {
        Self::current()
    }
}
