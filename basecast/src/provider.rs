use std::error::Error;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error as ThisError;

use crate::config::BootCmd;
use crate::hardware::HardwareSpec;

/// A virtualization provider call failed. Always fatal: the workflow aborts
/// immediately and leaves partial provider state as-is.
#[derive(Debug, ThisError)]
#[error("{context}")]
pub struct ProviderError {
    context: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ProviderError {
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

/// The provider's answer to an IP query. Explicit variants instead of
/// distinguishable exception types, so callers decide what is transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpQuery {
    /// The machine is not running yet.
    NotStarted,
    /// The machine exists but cannot currently be queried.
    Inaccessible,
    /// The reported address; may still be syntactically empty.
    Address(String),
}

/// The kind of virtual medium to register with the provider.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum MediumKind {
    Dvd,
    HardDisk,
}

/// The virtualization capability the install workflow runs against. Every
/// operation either succeeds or fails fatally; the core never retries these.
pub trait Provider {
    /// Opaque reference to a VM instance, owned by the provider.
    type Machine;

    /// A registered virtual medium.
    type Medium;

    /// Create a new disk image of the given size in bytes.
    fn create_disk(&self, location: &str, size: u64) -> Result<(), ProviderError>;

    /// Look up an already-registered medium by location.
    fn find_medium(&self, location: &str) -> Result<Option<Self::Medium>, ProviderError>;

    /// Register the medium at the given location with the provider.
    fn open_medium(&self, location: &str, kind: MediumKind) -> Result<Self::Medium, ProviderError>;

    /// Create a VM instance with the given hardware.
    fn create_instance(
        &self,
        name: &str,
        metadata: &[(String, String)],
        spec: &HardwareSpec,
    ) -> Result<Self::Machine, ProviderError>;

    fn start(&self, machine: &Self::Machine) -> Result<(), ProviderError>;

    /// Send a synthetic keystroke sequence to the machine's keyboard. The
    /// provider interprets `BootCmd::Wait` items as inter-key delays.
    fn send_keyboard(&self, machine: &Self::Machine, sequence: &[BootCmd])
    -> Result<(), ProviderError>;

    /// Request a graceful ACPI-style shutdown.
    fn stop(&self, machine: &Self::Machine) -> Result<(), ProviderError>;

    /// Cut power unconditionally.
    fn power_down(&self, machine: &Self::Machine) -> Result<(), ProviderError>;

    /// Destroy the instance. When `delete_disks` is false, attached disk
    /// images survive the instance.
    fn destroy(&self, machine: Self::Machine, delete_disks: bool) -> Result<(), ProviderError>;

    /// Convert the disk image at `location` into a read-only base image.
    fn compact_to_immutable(&self, location: &str) -> Result<(), ProviderError>;

    /// Query the machine's IP address at the given network-interface slot.
    fn get_ip(&self, machine: &Self::Machine, slot: u32) -> Result<IpQuery, ProviderError>;
}
