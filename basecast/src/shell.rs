use std::error::Error;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error as ThisError;
use tracing::debug;

/// A remote-login attempt or command failed. During the install polling
/// window these are expected and consumed by the detector; they only matter
/// to callers using a session directly.
#[derive(Debug, ThisError)]
#[error("{context}")]
pub struct ShellError {
    context: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ShellError {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            source: None,
        }
    }

    pub fn with_source(
        context: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Captured result of a single remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// The remote-login transport used to probe the guest.
pub trait RemoteShell {
    type Session: RemoteSession;

    /// Open an authenticated session to `host`, bounded by `connect_timeout`.
    /// Host keys are never verified; install guests are throwaway.
    fn open_session(
        &self,
        host: &str,
        username: &str,
        password: &str,
        connect_timeout: Duration,
    ) -> Result<Self::Session, ShellError>;
}

pub trait RemoteSession {
    fn is_connected(&self) -> bool;

    /// Execute one command and capture its exit code and raw output.
    fn exec(&mut self, command: &str) -> Result<ExecOutput, ShellError>;
}

/// Password-authenticated SSH transport over `ssh2`.
pub struct SshShell;

pub struct SshSession {
    session: ssh2::Session,
}

impl RemoteShell for SshShell {
    type Session = SshSession;

    fn open_session(
        &self,
        host: &str,
        username: &str,
        password: &str,
        connect_timeout: Duration,
    ) -> Result<SshSession, ShellError> {
        debug!("Trying SSH: {}@{}:22", username, host);

        let addr = (host, 22)
            .to_socket_addrs()
            .map_err(|e| ShellError::with_source(format!("cannot resolve {host}"), e))?
            .next()
            .ok_or_else(|| ShellError::new(format!("cannot resolve {host}")))?;

        let stream = TcpStream::connect_timeout(&addr, connect_timeout)
            .map_err(|e| ShellError::with_source(format!("cannot reach {addr}"), e))?;

        let mut session =
            ssh2::Session::new().map_err(|e| ShellError::with_source("session setup failed", e))?;
        session.set_tcp_stream(stream);

        // Bound the handshake and auth as well, not just the TCP connect
        session.set_timeout(connect_timeout.as_millis().try_into().unwrap_or(u32::MAX));

        session
            .handshake()
            .map_err(|e| ShellError::with_source("handshake failed", e))?;
        session
            .userauth_password(username, password)
            .map_err(|e| ShellError::with_source("authentication failed", e))?;

        debug!("Established SSH connection");
        Ok(SshSession { session })
    }
}

impl RemoteSession for SshSession {
    fn is_connected(&self) -> bool {
        self.session.authenticated()
    }

    fn exec(&mut self, command: &str) -> Result<ExecOutput, ShellError> {
        debug!(command, "Executing command over ssh");

        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| ShellError::with_source("cannot open channel", e))?;
        channel
            .exec(command)
            .map_err(|e| ShellError::with_source("exec failed", e))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| ShellError::with_source("cannot read stdout", e))?;

        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| ShellError::with_source("cannot read stderr", e))?;

        channel
            .wait_close()
            .map_err(|e| ShellError::with_source("channel did not close", e))?;
        let exit_code = channel
            .exit_status()
            .map_err(|e| ShellError::with_source("no exit status", e))?;

        debug!("Exit code: {}", exit_code);
        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}
