use std::time::Duration;

use thiserror::Error;

pub mod config;
pub mod detect;
pub mod hardware;
pub mod install;
pub mod provider;
pub mod shell;
pub mod wait;

pub use config::{BootCmd, InstallConfig};
pub use hardware::HardwareSpec;
pub use install::install_os;
pub use provider::{IpQuery, MediumKind, Provider, ProviderError};
pub use shell::{ExecOutput, RemoteSession, RemoteShell, ShellError};

/// A fatal failure of an install run. Transient conditions (guest not yet
/// reachable, installer still running) never surface here; they are consumed
/// by the polling loop in [`detect`].
#[derive(Debug, Error)]
pub enum InstallError {
    /// A required configuration field was missing or invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A virtualization provider call failed. Never retried; the workflow
    /// aborts and leaves partial provider state as-is.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Installation was not observed to finish before the deadline.
    #[error("installation did not finish within {0:?}")]
    InstallationTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, InstallError>;
