//! Stand-in daemon processes built from `/bin/sh` one-liners.
//!
//! The supervisor appends `--address <addr>` to every invocation; with
//! `sh -c`, those land in `$1` and `$2`, so scripts can echo or ignore them.

use std::path::PathBuf;

/// Shell used to run fixture scripts.
pub const SHELL: &str = "/bin/sh";

/// A shell-script daemon: program plus arguments, minus the address flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDaemon {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments placed before the address flag.
    pub args: Vec<String>,
}

impl ScriptDaemon {
    /// Runs `script` under `sh -c`.
    #[must_use]
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from(SHELL),
            args: vec!["-c".into(), script.into(), "fake-daemon".into()],
        }
    }

    /// Sleeps until signalled.
    #[must_use]
    pub fn sleeper() -> Self {
        Self::new("exec sleep 300")
    }

    /// Exits immediately with `code`.
    #[must_use]
    pub fn exits_with(code: u8) -> Self {
        Self::new(format!("exit {code}"))
    }

    /// Prints its address on stdout, then sleeps until signalled.
    #[must_use]
    pub fn announcer() -> Self {
        Self::new("echo \"listening on $2\"; exec sleep 300")
    }

    /// Ignores SIGTERM; only SIGKILL stops it.
    #[must_use]
    pub fn stubborn() -> Self {
        Self::new("trap '' TERM; while :; do sleep 1; done")
    }
}
