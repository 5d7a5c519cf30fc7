//! Launch specification and output sinks.
//!
//! A [`LaunchSpec`] is captured once at start time and reused verbatim by
//! restart: same program, same argument vector, same output sinks.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};

use crate::error::{Result, SupervisorError};

/// Default flag used to pass the listen address to the daemon.
pub const DEFAULT_ADDRESS_FLAG: &str = "--address";

/// Destination for one of the daemon's output streams.
///
/// A sink is reusable: every spawn derives a fresh [`Stdio`] from it, so
/// output from every generation of a restarted daemon lands in the same
/// place.
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    /// Discard output.
    #[default]
    Null,
    /// Share the supervisor's own stream.
    Inherit,
    /// Write into a shared file handle.
    File(Arc<File>),
}

impl OutputSink {
    /// Wraps an open file as a sink.
    #[must_use]
    pub fn file(file: File) -> Self {
        Self::File(Arc::new(file))
    }

    /// Creates (truncating) the file at `path` and wraps it as a sink.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::file(File::create(path)?))
    }

    /// Builds a [`Stdio`] for one spawn.
    pub fn to_stdio(&self) -> std::io::Result<Stdio> {
        match self {
            Self::Null => Ok(Stdio::null()),
            Self::Inherit => Ok(Stdio::inherit()),
            Self::File(file) => Ok(Stdio::from(file.try_clone()?)),
        }
    }

    /// Returns true if both sinks write to the same destination.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Inherit, Self::Inherit) => true,
            (Self::File(a), Self::File(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Everything needed to (re)launch the daemon.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    program: PathBuf,
    args: Vec<OsString>,
    stdout: OutputSink,
    stderr: OutputSink,
}

impl LaunchSpec {
    /// Creates a spec with both outputs discarded.
    #[must_use]
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdout: OutputSink::Null,
            stderr: OutputSink::Null,
        }
    }

    /// Appends the `flag address` pair to the argument vector.
    #[must_use]
    pub fn with_address(mut self, flag: &str, address: &str) -> Self {
        self.args.push(flag.into());
        self.args.push(address.into());
        self
    }

    /// Sets the standard output sink.
    #[must_use]
    pub fn with_stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = sink;
        self
    }

    /// Sets the standard error sink.
    #[must_use]
    pub fn with_stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = sink;
        self
    }

    /// Program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument vector, excluding the program itself.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Standard output sink.
    #[must_use]
    pub const fn stdout(&self) -> &OutputSink {
        &self.stdout
    }

    /// Standard error sink.
    #[must_use]
    pub const fn stderr(&self) -> &OutputSink {
        &self.stderr
    }

    /// Returns true if `other` would launch the identical invocation.
    #[must_use]
    pub fn same_invocation(&self, other: &Self) -> bool {
        self.program == other.program
            && self.args == other.args
            && self.stdout.same_as(&other.stdout)
            && self.stderr.same_as(&other.stderr)
    }

    /// Builds the command. Stdin is always closed and the child is killed
    /// if its handle is dropped.
    pub fn command(&self) -> std::io::Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(self.stdout.to_stdio()?)
            .stderr(self.stderr.to_stdio()?)
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Spawns a new child from this spec.
    ///
    /// A failed spawn never yields a child, so there is nothing left to reap.
    pub fn spawn(&self) -> Result<Child> {
        self.command()
            .and_then(|mut cmd| cmd.spawn())
            .map_err(|e| SupervisorError::spawn(self.program.display().to_string(), e))
    }
}
