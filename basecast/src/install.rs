use std::thread;

use tracing::{debug, info};

use crate::config::InstallConfig;
use crate::detect::InstallationDetector;
use crate::hardware::{HOST_ONLY_SLOT, HardwareSpec};
use crate::provider::{MediumKind, Provider};
use crate::shell::RemoteShell;
use crate::Result;

/// Look the medium up by location and register it if the provider does not
/// know it yet. Newly opened media are never deregistered afterwards.
fn ensure_medium<P: Provider>(
    provider: &P,
    location: &str,
    kind: MediumKind,
) -> Result<P::Medium> {
    Ok(match provider.find_medium(location)? {
        Some(medium) => medium,
        None => {
            debug!(location, %kind, "Registering new medium");
            provider.open_medium(location, kind)?
        }
    })
}

/// Run one complete unattended installation and return the location of the
/// resulting immutable base image.
///
/// The workflow is strictly sequential and blocking. Every provider call is
/// fatal on failure and nothing is rolled back: a failure at step N leaves
/// the VM and disk in whatever state step N-1 produced. Callers must not run
/// two installs against the same disk location or machine name concurrently.
pub fn install_os<P, S>(provider: &P, shell: &S, config: &InstallConfig) -> Result<String>
where
    P: Provider,
    S: RemoteShell,
{
    config.check()?;
    info!(name = %config.name, disk = %config.disk, "Starting unattended installation");

    provider.create_disk(&config.disk, config.disk_size)?;

    ensure_medium(provider, &config.os_media, MediumKind::Dvd)?;
    ensure_medium(provider, &config.tools_media, MediumKind::Dvd)?;

    let spec = HardwareSpec::for_install(config);
    let machine = provider.create_instance(&config.name, &[], &spec)?;
    provider.start(&machine)?;

    // Let the BIOS/bootloader reach the point of accepting input
    debug!(wait = ?config.wait_start(), "Waiting for boot menu");
    thread::sleep(config.wait_start());

    info!("Sending boot command");
    provider.send_keyboard(&machine, &config.boot_command)?;

    // The install takes materially longer than this; don't hammer a system
    // that isn't even minimally booted
    debug!(wait = ?config.wait_boot(), "Waiting for installer to get underway");
    thread::sleep(config.wait_boot());

    let detector =
        InstallationDetector::new(shell, &config.username, &config.password, &config.marker_path);
    detector.wait_for_installation(
        provider,
        &machine,
        HOST_ONLY_SLOT,
        config.install_poll_interval(),
        config.install_timeout(),
    )?;

    // Let the freshly rebooted guest settle before shutting it down
    thread::sleep(config.post_install_wait());

    info!("Shutting the machine down");
    provider.stop(&machine)?;
    thread::sleep(config.shut_down_wait());

    // In case the graceful stop didn't complete
    provider.power_down(&machine)?;
    provider.destroy(machine, false)?;

    info!(disk = %config.disk, "Converting disk into an immutable base image");
    provider.compact_to_immutable(&config.disk)?;

    Ok(config.disk.clone())
}
