use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::InstallError;

/// One item of the boot key sequence sent to the VM's synthetic keyboard.
/// An ordered mix of these drives an interactive bootloader/installer menu
/// non-interactively, e.g. `[Escape, Wait(1000), Type("linux ks=...".into()), Enter]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootCmd {
    Enter,
    Escape,
    Spacebar,
    Tab,

    /// Input the given text characters.
    Type(String),

    /// Pause the given amount of milliseconds before the next keystroke.
    Wait(u64),
}

/// The configuration for a single install run. Constructed once (merged over
/// the defaults below by serde) and read-only thereafter.
#[derive(Clone, Serialize, Deserialize, Validate, Debug)]
pub struct InstallConfig {
    /// The VM instance name
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    /// Where the new disk image will be created
    #[validate(length(min = 1))]
    pub disk: String,

    /// The disk image size in bytes
    #[serde(default = "default_disk_size")]
    #[validate(range(min = 1))]
    pub disk_size: u64,

    /// Location of the OS install medium
    #[validate(length(min = 1))]
    pub os_media: String,

    /// Location of the guest-tooling medium
    #[validate(length(min = 1))]
    pub tools_media: String,

    /// The key sequence that selects and parameterizes the unattended install
    #[validate(length(min = 1))]
    pub boot_command: Vec<BootCmd>,

    /// Login user for the installed guest
    #[validate(length(min = 1))]
    pub username: String,

    /// Login password for the installed guest
    #[serde(skip_serializing)]
    pub password: String,

    /// The amount of memory to allocate to the VM, in MiB
    #[serde(default = "default_memory_size")]
    #[validate(range(min = 1))]
    pub memory_size: u64,

    /// Guest path whose presence means post-install setup is still pending
    #[serde(default = "default_marker_path")]
    #[validate(length(min = 1))]
    pub marker_path: String,

    /// Seconds to wait after starting the VM before sending keystrokes
    #[serde(default = "default_wait_start")]
    pub wait_start: u64,

    /// Seconds to wait for the installer to get underway before polling
    #[serde(default = "default_wait_boot")]
    pub wait_boot: u64,

    /// Seconds between installation-completion probes
    #[serde(default = "default_install_poll_interval")]
    pub install_poll_interval: u64,

    /// Seconds before the installation wait fails fatally
    #[serde(default = "default_install_timeout")]
    pub install_timeout: u64,

    /// Seconds to let the freshly rebooted guest settle
    #[serde(default = "default_post_install_wait")]
    pub post_install_wait: u64,

    /// Seconds to wait after the graceful stop before powering off
    #[serde(default = "default_shut_down_wait")]
    pub shut_down_wait: u64,
}

fn default_disk_size() -> u64 {
    8192 * 1024 * 1024
}

fn default_memory_size() -> u64 {
    2048
}

fn default_marker_path() -> String {
    String::from("/tmp/.guest-tools-pending")
}

fn default_wait_start() -> u64 {
    5
}

fn default_wait_boot() -> u64 {
    180
}

fn default_install_poll_interval() -> u64 {
    5
}

fn default_install_timeout() -> u64 {
    300
}

fn default_post_install_wait() -> u64 {
    30
}

fn default_shut_down_wait() -> u64 {
    30
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            disk: String::new(),
            disk_size: default_disk_size(),
            os_media: String::new(),
            tools_media: String::new(),
            boot_command: Vec::new(),
            username: String::new(),
            password: String::new(),
            memory_size: default_memory_size(),
            marker_path: default_marker_path(),
            wait_start: default_wait_start(),
            wait_boot: default_wait_boot(),
            install_poll_interval: default_install_poll_interval(),
            install_timeout: default_install_timeout(),
            post_install_wait: default_post_install_wait(),
            shut_down_wait: default_shut_down_wait(),
        }
    }
}

impl InstallConfig {
    /// Read a configuration file, chosen by extension (`.json`, `.yaml`/`.yml`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<InstallConfig, InstallError> {
        let path = path.as_ref();
        let content = std::fs::read(path)
            .map_err(|e| InstallError::Configuration(format!("{}: {e}", path.display())))?;

        let config: InstallConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_slice(&content)
                .map_err(|e| InstallError::Configuration(e.to_string()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_slice(&content)
                .map_err(|e| InstallError::Configuration(e.to_string()))?,
            _ => {
                return Err(InstallError::Configuration(format!(
                    "unsupported config format: {}",
                    path.display()
                )));
            }
        };
        config.check()?;
        Ok(config)
    }

    /// Run field validation, mapping failures into [`InstallError::Configuration`].
    pub fn check(&self) -> Result<(), InstallError> {
        self.validate()
            .map_err(|e| InstallError::Configuration(e.to_string()))
    }

    pub fn wait_start(&self) -> Duration {
        Duration::from_secs(self.wait_start)
    }

    pub fn wait_boot(&self) -> Duration {
        Duration::from_secs(self.wait_boot)
    }

    pub fn install_poll_interval(&self) -> Duration {
        Duration::from_secs(self.install_poll_interval)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout)
    }

    pub fn post_install_wait(&self) -> Duration {
        Duration::from_secs(self.post_install_wait)
    }

    pub fn shut_down_wait(&self) -> Duration {
        Duration::from_secs(self.shut_down_wait)
    }
}
