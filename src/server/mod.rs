/// Server management module for Jetty Wrapper.
///
/// This module holds the building blocks the supervisor composes: the Jetty
/// process handle, the PID store, reachability probes and the lifecycle log.
/// All components log through `tracing` under a shared process target.
///
/// # Components
///
/// * `lifecycle` - Session ids and the bounded event history
/// * `pid` - PID file naming, atomic writes and fallback locations
/// * `probe` - TCP port and process liveness checks, readiness wait
/// * `process` - Launch command construction and the detached Jetty child
///
/// # Examples
///
/// Checking whether a previous Jetty is still around:
///
/// ```no_run
/// use jetty_wrapper::server::{PidStore, is_process_alive};
/// use std::path::Path;
///
/// let store = PidStore::new(Path::new("/srv/app"), Path::new("/srv/app/jetty")).unwrap();
/// if let Some(pid) = store.read() {
///     println!("pid {} alive: {}", pid, is_process_alive(pid));
/// }
/// ```
///
/// Waiting for a port:
///
/// ```no_run
/// use jetty_wrapper::server::startup_wait;
/// use std::time::Duration;
///
/// # async fn example() {
/// let ready = startup_wait(8983, Duration::from_secs(5)).await;
/// println!("ready: {}", ready);
/// # }
/// ```
pub mod lifecycle;
pub mod pid;
pub mod probe;
mod process;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

pub use lifecycle::{LifecycleEvent, LifecycleLog, LifecycleRecord, SessionId};
pub use pid::{PidStore, to_filename};
pub use probe::{is_port_open, is_process_alive, startup_wait};
pub use process::{JettyProcess, LOG_FILE_NAME, ServerStatus, kill_pid, launch_arguments, shell_escape};
