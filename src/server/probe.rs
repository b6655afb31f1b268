//! Reachability and liveness probes.

use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use super::PROCESS_TARGET;

/// Upper bound on a single connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// Delay between readiness polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Whether something accepts TCP connections on `127.0.0.1:port`.
///
/// Refused, unreachable and timed-out connects all count as closed.
pub async fn is_port_open(port: u16) -> bool {
    match time::timeout(CONNECT_TIMEOUT, TcpStream::connect((Ipv4Addr::LOCALHOST, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(error)) => {
            debug!(target: PROCESS_TARGET, port, error = %error, "port closed");
            false
        }
        Err(_) => {
            debug!(target: PROCESS_TARGET, port, "connect timed out");
            false
        }
    }
}

/// Whether `pid` names a live process.
///
/// Only "no such process" counts as dead. Permission errors and any other
/// probe failure report the process as alive so a second instance is never
/// started on top of it.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw == 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(errno) => {
            debug!(target: PROCESS_TARGET, pid, error = %errno, "liveness probe inconclusive; assuming alive");
            true
        }
    }
}

#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    // No signal-0 probe here; only PID 0 is known dead.
    pid != 0
}

/// Polls [`is_port_open`] once per [`POLL_INTERVAL`] until `wait` elapses.
///
/// Returns `true` as soon as the port opens. A timeout is logged and reported
/// as `false`; it is never an error. A wait too long to represent as an
/// instant polls without a deadline.
pub async fn startup_wait(port: u16, wait: Duration) -> bool {
    let deadline = Instant::now().checked_add(wait);
    loop {
        if is_port_open(port).await {
            debug!(target: PROCESS_TARGET, port, "jetty is accepting connections");
            return true;
        }
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                POLL_INTERVAL.min(deadline - now)
            }
            None => POLL_INTERVAL,
        };
        time::sleep(pause).await;
    }
    warn!(
        target: PROCESS_TARGET,
        port,
        wait_secs = wait.as_secs(),
        "jetty did not open its port within the startup wait; continuing anyway"
    );
    false
}
