//! Error types for remote execution and cluster bootstrap.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by a single remote command execution.
///
/// The executor never retries; every variant reaches the caller as-is.
#[derive(Error, Debug)]
pub enum ExecError {
    /// None of the configured private keys could be loaded.
    #[error("no SSH authentication methods available - could not load a key from: {tried}")]
    NoCredential { tried: String },

    /// TCP dial, SSH handshake or authentication failed.
    #[error("failed to connect to SSH server {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// The connection phase as a whole exceeded its bound.
    #[error("SSH connection to {addr} timed out after {}s", .timeout.as_secs())]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The session channel could not be opened after connecting.
    #[error("failed to create SSH session: {0}")]
    Session(String),

    /// The command did not finish in time. The remote process is left running.
    #[error("SSH command execution timed out after {}s", .timeout.as_secs())]
    CommandTimeout { timeout: Duration },

    /// The command exited nonzero or the transport failed mid-execution.
    #[error("command execution failed: {reason}, output: {output}")]
    CommandFailed { reason: String, output: String },
}

/// A private key file that could not be turned into an auth method.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The key file could not be read.
    #[error("unable to read private key {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file does not contain a private key.
    #[error("unable to parse private key {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// The key is passphrase protected.
    #[error("private key {} is encrypted", .path.display())]
    Encrypted { path: PathBuf },
}

/// The compute lister could not enumerate instances.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ListError(pub String);

impl From<ecloud::ApiError> for ListError {
    fn from(err: ecloud::ApiError) -> Self {
        Self(err.to_string())
    }
}

/// Local filesystem failures while persisting credentials.
#[derive(Error, Debug)]
pub enum FsError {
    /// Directory creation failed.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the file failed.
    #[error("failed to write file {}: {source}", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Hard failures of the bootstrap pipeline (discovery, inventory, install).
///
/// Credential retrieval and persistence never produce one of these; they
/// only change the final report message.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Instance discovery failed.
    #[error("failed to list compute instances: {0}")]
    List(#[from] ListError),

    /// Discovery found nothing to install onto.
    #[error("no matching instances: no instance name contains 'control-plane' or 'node'")]
    EmptyInventory,

    /// The role list could not be encoded.
    #[error("failed to serialize inventory: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The inventory creation command failed.
    #[error("inventory creation failed: {0}")]
    Inventory(#[source] ExecError),

    /// The cluster installation command failed.
    #[error("cluster installation failed: {0}")]
    Install(#[source] ExecError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_messages_carry_duration() {
        let err = ExecError::CommandTimeout {
            timeout: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "SSH command execution timed out after 300s");

        let err = ExecError::ConnectTimeout {
            addr: "10.0.0.1:22".into(),
            timeout: Duration::from_secs(45),
        };
        assert_eq!(
            err.to_string(),
            "SSH connection to 10.0.0.1:22 timed out after 45s"
        );
    }

    #[test]
    fn test_bootstrap_error_wraps_exec_error() {
        let err = BootstrapError::Inventory(ExecError::CommandTimeout {
            timeout: Duration::from_secs(300),
        });
        assert!(err.to_string().starts_with("inventory creation failed: "));
        assert!(err.to_string().contains("timed out after 300s"));
    }
}
