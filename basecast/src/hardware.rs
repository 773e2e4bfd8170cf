use serde::{Deserialize, Serialize};

use crate::config::InstallConfig;

/// The host-only virtual network every install VM's second adapter binds to.
pub const HOST_ONLY_NETWORK: &str = "vboxnet0";

/// Adapter slot the host can reach the guest on (the host-only adapter).
pub const HOST_ONLY_SLOT: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkAdapter {
    Nat,
    HostOnly(String),
}

/// One device slot on a storage controller, referenced by medium location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageDevice {
    HardDisk(String),
    Empty,
    OpticalDrive(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageController {
    pub name: String,
    pub devices: Vec<StorageDevice>,
}

/// Read-only hardware description for an install VM, derived deterministically
/// from the configuration. Recomputed each run, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSpec {
    pub cpu_count: u32,
    /// Memory size in MiB
    pub memory_size: u64,
    pub network: Vec<NetworkAdapter>,
    pub storage: StorageController,
}

impl HardwareSpec {
    /// Build the fixed install-time hardware: one CPU, a NAT adapter plus a
    /// host-only adapter, and an IDE controller exposing the new disk, an
    /// empty slot, the OS install medium and the guest-tooling medium in that
    /// order.
    pub fn for_install(config: &InstallConfig) -> Self {
        Self {
            cpu_count: 1,
            memory_size: config.memory_size,
            network: vec![
                NetworkAdapter::Nat,
                NetworkAdapter::HostOnly(String::from(HOST_ONLY_NETWORK)),
            ],
            storage: StorageController {
                name: String::from("IDE"),
                devices: vec![
                    StorageDevice::HardDisk(config.disk.clone()),
                    StorageDevice::Empty,
                    StorageDevice::OpticalDrive(config.os_media.clone()),
                    StorageDevice::OpticalDrive(config.tools_media.clone()),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_slots_are_fixed_order() {
        let config = InstallConfig {
            disk: String::from("/images/base.vdi"),
            os_media: String::from("/isos/install.iso"),
            tools_media: String::from("/isos/tools.iso"),
            memory_size: 4096,
            ..Default::default()
        };

        let spec = HardwareSpec::for_install(&config);
        assert_eq!(spec.cpu_count, 1);
        assert_eq!(spec.memory_size, 4096);
        assert_eq!(
            spec.storage.devices,
            vec![
                StorageDevice::HardDisk(String::from("/images/base.vdi")),
                StorageDevice::Empty,
                StorageDevice::OpticalDrive(String::from("/isos/install.iso")),
                StorageDevice::OpticalDrive(String::from("/isos/tools.iso")),
            ]
        );
        assert_eq!(
            spec.network,
            vec![
                NetworkAdapter::Nat,
                NetworkAdapter::HostOnly(String::from(HOST_ONLY_NETWORK)),
            ]
        );
    }
}
