use std::time::Duration;

use tracing::{debug, info};

use crate::provider::{IpQuery, Provider};
use crate::shell::{RemoteSession, RemoteShell};
use crate::wait::{Poll, WaitError, wait_for};
use crate::{InstallError, Result};

/// Printed by the marker command iff the marker file still exists.
const SENTINEL: &str = "yes";

/// Connect timeout for each login probe. Short on purpose: a guest that is
/// mid-install either refuses the connection quickly or is not routable yet.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve the machine's current IP at the given adapter slot.
///
/// "Not started", "inaccessible" and a syntactically empty address are all
/// transient (the guest is still booting) and map to [`Poll::Pending`]; any
/// other provider failure is fatal.
pub fn machine_ip<P: Provider>(
    provider: &P,
    machine: &P::Machine,
    slot: u32,
) -> Result<Poll<String>> {
    Ok(match provider.get_ip(machine, slot)? {
        IpQuery::NotStarted | IpQuery::Inaccessible => Poll::Pending,
        IpQuery::Address(address) if address.trim().is_empty() => Poll::Pending,
        IpQuery::Address(address) => Poll::Ready(address),
    })
}

/// Decides whether the unattended installation has finished by logging into
/// the guest and checking for the post-install marker file.
pub struct InstallationDetector<'a, S: RemoteShell> {
    shell: &'a S,
    username: &'a str,
    password: &'a str,
    marker_path: &'a str,
}

impl<'a, S: RemoteShell> InstallationDetector<'a, S> {
    pub fn new(shell: &'a S, username: &'a str, password: &'a str, marker_path: &'a str) -> Self {
        Self {
            shell,
            username,
            password,
            marker_path,
        }
    }

    fn marker_command(&self) -> String {
        format!("test -e '{}' && echo {}", self.marker_path, SENTINEL)
    }

    /// One completion probe against a reachable address. Login failures and
    /// dropped commands are expected while the installer still owns the
    /// machine, so they poll again rather than fail.
    pub fn is_installed(&self, ip: &str) -> Poll<()> {
        let mut session =
            match self
                .shell
                .open_session(ip, self.username, self.password, CONNECT_TIMEOUT)
            {
                Ok(session) => session,
                Err(error) => {
                    debug!(ip, %error, "Guest not yet accepting logins");
                    return Poll::Pending;
                }
            };

        let output = match session.exec(&self.marker_command()) {
            Ok(output) => output,
            Err(error) => {
                debug!(ip, %error, "Marker check did not complete");
                return Poll::Pending;
            }
        };

        // Only stdout matters here; the command exits non-zero when the
        // marker is gone
        if output.stdout == format!("{SENTINEL}\n") {
            debug!(ip, "Marker still present; installation in progress");
            Poll::Pending
        } else {
            info!(ip, "Installation finished");
            Poll::Ready(())
        }
    }

    /// Wait until the installation has finished, polling every `interval` up
    /// to `timeout`. "No IP yet" and "reachable but still installing" share
    /// this one bounded retry path.
    pub fn wait_for_installation<P: Provider>(
        &self,
        provider: &P,
        machine: &P::Machine,
        slot: u32,
        interval: Duration,
        timeout: Duration,
    ) -> Result<()> {
        info!(?timeout, "Waiting for installation to finish");

        wait_for(
            || {
                Ok(match machine_ip(provider, machine, slot)? {
                    Poll::Pending => Poll::Pending,
                    Poll::Ready(ip) => self.is_installed(&ip),
                })
            },
            interval,
            timeout,
        )
        .map_err(|error| match error {
            WaitError::Timeout(elapsed) => InstallError::InstallationTimeout(elapsed),
            WaitError::Probe(error) => error,
        })
    }
}
