//! `ssh2`-backed [`RemoteExecutor`].
//!
//! `ssh2` is blocking, so the connection phase and the command both run on
//! tokio's blocking pool. The async side only races them against their
//! deadlines. A command that times out is abandoned: its thread finishes on
//! its own once the session read timeout trips, and the remote process is
//! never signalled.

use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ssh2::{ExtendedData, Session};
use tracing::{debug, info, warn};

use super::keys::{resolve_auth, AuthMethod, FileKeyLoader, KeyLoader};
use super::wait::{first_of, Outcome, Progress};
use super::{CommandResult, CommandSpec, RemoteExecutor, RemoteTarget};
use crate::config::NodeupConfig;
use crate::error::ExecError;

/// Extra time the session read timeout allows past the command deadline.
const SESSION_GRACE: Duration = Duration::from_secs(30);

/// Which trait entry point a command came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Capture,
}

/// Receives progress reports for long-running commands.
pub trait ProgressObserver: Send + Sync {
    /// Called periodically while `command` is still running.
    fn on_progress(&self, command: &str, progress: Progress);
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, _command: &str, progress: Progress) {
        info!(
            "Command still running... Elapsed: {}s, Remaining: {}s",
            progress.elapsed.as_secs(),
            progress.remaining.as_secs()
        );
    }
}

/// Runs commands over SSH with public key authentication.
///
/// Host keys are not verified.
#[derive(Clone)]
pub struct SshExecutor {
    config: Arc<NodeupConfig>,
    keys: Arc<dyn KeyLoader>,
    observer: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for SshExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshExecutor")
            .field("bastion_host", &self.config.bastion_host)
            .finish_non_exhaustive()
    }
}

impl SshExecutor {
    /// Create an executor reading keys from disk and logging progress.
    #[must_use]
    pub fn new(config: Arc<NodeupConfig>) -> Self {
        Self {
            config,
            keys: Arc::new(FileKeyLoader),
            observer: Arc::new(LogProgress),
        }
    }

    /// Use a different key loader.
    #[must_use]
    pub fn with_key_loader(mut self, keys: Arc<dyn KeyLoader>) -> Self {
        self.keys = keys;
        self
    }

    /// Use a different progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Progress period for a command, if it qualifies as long-running.
    /// Captures never report progress.
    fn tick_period(&self, mode: Mode, timeout: Duration) -> Option<Duration> {
        match mode {
            Mode::Run => (timeout > self.config.ssh.long_running_threshold)
                .then_some(self.config.ssh.progress_interval),
            Mode::Capture => None,
        }
    }

    /// Wait for a started command, reporting progress to the observer.
    async fn watch<F>(
        &self,
        command: &str,
        work: F,
        timeout: Duration,
        mode: Mode,
    ) -> Result<CommandResult, ExecError>
    where
        F: std::future::Future<Output = Result<Vec<u8>, ExecError>>,
    {
        let observer = Arc::clone(&self.observer);
        supervise(work, timeout, self.tick_period(mode, timeout), |p| {
            observer.on_progress(command, p);
        })
        .await
    }

    async fn execute(
        &self,
        target: &RemoteTarget,
        spec: &CommandSpec,
        mode: Mode,
    ) -> Result<CommandResult, ExecError> {
        if spec.timeout.is_zero() {
            return Err(ExecError::CommandTimeout {
                timeout: spec.timeout,
            });
        }

        let auth = resolve_auth(self.keys.as_ref(), &target.key_paths)?;
        let session = self.connect(target, auth, spec.timeout).await?;

        debug!(host = %target.host, command = %spec.command, "Executing remote command");
        let command = spec.command.clone();
        let handle = tokio::task::spawn_blocking(move || exec_blocking(&session, &command));
        let work = async move {
            handle.await.unwrap_or_else(|e| {
                Err(ExecError::CommandFailed {
                    reason: format!("execution task failed: {e}"),
                    output: String::new(),
                })
            })
        };

        self.watch(&spec.command, work, spec.timeout, mode).await
    }

    /// Dial, handshake and authenticate within the connect timeout.
    async fn connect(
        &self,
        target: &RemoteTarget,
        auth: AuthMethod,
        command_timeout: Duration,
    ) -> Result<Session, ExecError> {
        let addr = target.addr();
        let user = target.user.clone();
        let dial_timeout = self.config.ssh.dial_timeout;
        let connect_timeout = self.config.ssh.connect_timeout;
        let session_timeout = command_timeout.saturating_add(SESSION_GRACE);

        debug!(%addr, user = %user, "Connecting to SSH server");
        let dial_addr = addr.clone();
        let task = tokio::task::spawn_blocking(move || {
            open_session(&dial_addr, &user, &auth, dial_timeout, session_timeout)
        });

        match tokio::time::timeout(connect_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ExecError::Connect {
                addr,
                reason: format!("connection task failed: {e}"),
            }),
            Err(_) => {
                warn!(%addr, "SSH connection phase timed out");
                Err(ExecError::ConnectTimeout {
                    addr,
                    timeout: connect_timeout,
                })
            }
        }
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(
        &self,
        target: &RemoteTarget,
        spec: &CommandSpec,
    ) -> Result<CommandResult, ExecError> {
        self.execute(target, spec, Mode::Run).await
    }

    async fn run_capture(
        &self,
        target: &RemoteTarget,
        spec: &CommandSpec,
    ) -> Result<String, ExecError> {
        let result = self.execute(target, spec, Mode::Capture).await?;
        Ok(result.output_lossy())
    }
}

/// Race a blocking command against its deadline.
pub(crate) async fn supervise<F>(
    work: F,
    timeout: Duration,
    period: Option<Duration>,
    on_tick: impl FnMut(Progress),
) -> Result<CommandResult, ExecError>
where
    F: std::future::Future<Output = Result<Vec<u8>, ExecError>>,
{
    let started = Instant::now();
    match first_of(work, timeout, period, on_tick).await {
        Outcome::Completed(Ok(output)) => Ok(CommandResult {
            output,
            succeeded: true,
            elapsed: started.elapsed(),
        }),
        Outcome::Completed(Err(e)) => Err(e),
        Outcome::TimedOut => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "Remote command timed out, leaving it running"
            );
            Err(ExecError::CommandTimeout { timeout })
        }
    }
}

fn open_session(
    addr: &str,
    user: &str,
    auth: &AuthMethod,
    dial_timeout: Duration,
    session_timeout: Duration,
) -> Result<Session, ExecError> {
    let connect_err = |reason: String| ExecError::Connect {
        addr: addr.to_string(),
        reason,
    };

    let mut last_err = None;
    let mut stream = None;
    for socket in addr
        .to_socket_addrs()
        .map_err(|e| connect_err(e.to_string()))?
    {
        match TcpStream::connect_timeout(&socket, dial_timeout) {
            Ok(tcp) => {
                stream = Some(tcp);
                break;
            }
            Err(e) => last_err = Some(e),
        }
    }
    let tcp = stream.ok_or_else(|| {
        connect_err(last_err.map_or_else(
            || "no addresses resolved".to_string(),
            |e| e.to_string(),
        ))
    })?;

    let mut session = Session::new().map_err(|e| connect_err(e.to_string()))?;
    session.set_timeout(millis(dial_timeout));
    session.set_tcp_stream(tcp);
    session
        .handshake()
        .map_err(|e| connect_err(format!("handshake failed: {e}")))?;
    session
        .userauth_pubkey_file(
            user,
            None,
            &auth.private_key,
            auth.passphrase.as_deref(),
        )
        .map_err(|e| connect_err(format!("authentication failed: {e}")))?;
    if !session.authenticated() {
        return Err(connect_err("authentication rejected".to_string()));
    }

    session.set_timeout(millis(session_timeout));
    Ok(session)
}

fn exec_blocking(session: &Session, command: &str) -> Result<Vec<u8>, ExecError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| ExecError::Session(e.to_string()))?;
    channel
        .handle_extended_data(ExtendedData::Merge)
        .map_err(|e| ExecError::Session(e.to_string()))?;

    let failed = |reason: String, output: &[u8]| ExecError::CommandFailed {
        reason,
        output: String::from_utf8_lossy(output).into_owned(),
    };

    channel
        .exec(command)
        .map_err(|e| failed(e.to_string(), &[]))?;

    let mut output = Vec::new();
    channel
        .read_to_end(&mut output)
        .map_err(|e| failed(e.to_string(), &output))?;
    channel
        .wait_close()
        .map_err(|e| failed(e.to_string(), &output))?;

    let status = channel
        .exit_status()
        .map_err(|e| failed(e.to_string(), &output))?;
    if status != 0 {
        return Err(failed(format!("exit status {status}"), &output));
    }
    Ok(output)
}

fn millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}
