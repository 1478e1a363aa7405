//! Remote command execution over SSH.
//!
//! [`RemoteExecutor`] is the seam the orchestrator drives; [`SshExecutor`] is
//! the production implementation on top of `ssh2`.

mod executor;
mod keys;
mod wait;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;

pub use executor::{LogProgress, ProgressObserver, SshExecutor};
pub use keys::{resolve_auth, AuthMethod, FileKeyLoader, KeyLoader};
pub use wait::{first_of, Outcome, Progress};

/// Where and as whom a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Hostname or IP address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Private keys to try, in order.
    pub key_paths: Vec<PathBuf>,
}

impl RemoteTarget {
    /// `host:port`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A command and its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Shell command line executed by the remote login shell.
    pub command: String,
    /// Bound on the execution phase, after the connection is up.
    pub timeout: Duration,
}

impl CommandSpec {
    /// Create a command spec.
    #[must_use]
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

/// Outcome of a command that finished within its timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Combined stdout and stderr.
    pub output: Vec<u8>,
    /// Whether the command exited zero.
    pub succeeded: bool,
    /// Time spent in the execution phase.
    pub elapsed: Duration,
}

impl CommandResult {
    /// Output decoded as UTF-8, lossily.
    #[must_use]
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs commands on a remote host.
///
/// Each call opens its own connection and closes it when done. A call that
/// times out returns without waiting for the remote process.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command, reporting progress if it is long-running.
    async fn run(&self, target: &RemoteTarget, spec: &CommandSpec)
        -> Result<CommandResult, ExecError>;

    /// Run a command and return its output as text.
    async fn run_capture(
        &self,
        target: &RemoteTarget,
        spec: &CommandSpec,
    ) -> Result<String, ExecError>;
}
