use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::trace;

/// The outcome of one probe attempt. A fatal error is the `Err` arm of the
/// surrounding `Result`, so every probe is `Pending | Ready | Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// Not there yet; keep polling.
    Pending,
    /// The awaited value.
    Ready(T),
}

#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// The probe never returned `Ready` before the deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The probe itself failed; never retried.
    #[error("probe failed: {0}")]
    Probe(E),
}

/// Repeatedly invoke `probe` until it returns `Ready`, sleeping `interval`
/// between attempts. The deadline is computed once at entry and checked every
/// iteration: once elapsed time reaches `timeout` the wait fails with
/// [`WaitError::Timeout`]. The probe always gets at least one attempt, even
/// with a zero timeout.
pub fn wait_for<T, E, F>(
    mut probe: F,
    interval: Duration,
    timeout: Duration,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Result<Poll<T>, E>,
{
    let start = Instant::now();
    let deadline = start + timeout;

    loop {
        match probe().map_err(WaitError::Probe)? {
            Poll::Ready(value) => return Ok(value),
            Poll::Pending => trace!(elapsed = ?start.elapsed(), "Probe still pending"),
        }

        if Instant::now() >= deadline {
            return Err(WaitError::Timeout(timeout));
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_success_returns_without_sleeping() {
        let start = Instant::now();
        let value: Result<u32, WaitError<&str>> = wait_for(
            || Ok(Poll::Ready(7)),
            Duration::from_secs(10),
            Duration::from_secs(10),
        );
        assert_eq!(value.unwrap(), 7);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn succeeds_after_several_attempts() {
        let mut attempts = 0;
        let value: Result<&str, WaitError<&str>> = wait_for(
            || {
                attempts += 1;
                if attempts < 4 {
                    Ok(Poll::Pending)
                } else {
                    Ok(Poll::Ready("done"))
                }
            },
            Duration::from_millis(10),
            Duration::from_secs(5),
        );
        assert_eq!(value.unwrap(), "done");
        assert_eq!(attempts, 4);
    }

    #[test]
    fn times_out_within_bounds() {
        let interval = Duration::from_millis(50);
        let timeout = Duration::from_millis(200);

        let start = Instant::now();
        let result: Result<(), WaitError<&str>> = wait_for(|| Ok(Poll::Pending), interval, timeout);
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(WaitError::Timeout(t)) if t == timeout));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + interval + Duration::from_millis(100));
    }

    #[test]
    fn zero_timeout_still_probes_once() {
        let mut attempts = 0;
        let result: Result<(), WaitError<&str>> = wait_for(
            || {
                attempts += 1;
                Ok(Poll::Pending)
            },
            Duration::from_secs(1),
            Duration::ZERO,
        );
        assert!(matches!(result, Err(WaitError::Timeout(_))));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn zero_interval_stays_bounded_by_the_deadline() {
        let start = Instant::now();
        let result: Result<(), WaitError<&str>> = wait_for(
            || Ok(Poll::Pending),
            Duration::ZERO,
            Duration::from_millis(100),
        );
        assert!(matches!(result, Err(WaitError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn probe_errors_are_fatal() {
        let result: Result<(), WaitError<&str>> = wait_for(
            || Err("broken"),
            Duration::from_millis(10),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(WaitError::Probe("broken"))));
    }
}
