// src/server/process.rs
use crate::config::LaunchSpec;
use crate::error::{Error, Result};
use async_process::{Child, Command};
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::PROCESS_TARGET;

/// Log file used in quiet mode, created in the Jetty home.
pub const LOG_FILE_NAME: &str = "jettywrapper.log";

/// Status of the supervised Jetty process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// No process handle
    Idle,
    /// Spawning and waiting for the port
    Starting,
    /// Started
    Running,
    /// Terminating
    Stopping,
}

/// A Jetty process spawned by this supervisor
pub struct JettyProcess {
    /// Child process
    child: Child,
    /// OS process id
    pid: u32,
}

impl JettyProcess {
    /// Spawn Jetty for a launch spec.
    ///
    /// The child runs in the Jetty home, in its own process group, and keeps
    /// running if the handle is dropped or this process exits.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let args = launch_arguments(spec);
        debug!(
            target: PROCESS_TARGET,
            java = %spec.java().display(),
            args = ?args,
            cwd = %spec.jetty_home().display(),
            "Spawning jetty"
        );

        let mut command = std::process::Command::new(spec.java());
        command.args(&args).current_dir(spec.jetty_home());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut command = Command::from(command);
        command.kill_on_drop(false).stdin(Stdio::null());

        if spec.quiet() {
            let log_path = spec.jetty_home().join(LOG_FILE_NAME);
            let log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .map_err(|e| {
                    Error::Process(format!(
                        "Failed to open log file {}: {}",
                        log_path.display(),
                        e
                    ))
                })?;
            let log_err = log
                .try_clone()
                .map_err(|e| Error::Process(format!("Failed to duplicate log handle: {}", e)))?;
            command.stdout(log).stderr(log_err);
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let child = command.spawn().map_err(|e| {
            Error::Process(format!(
                "Failed to start {}: {}",
                spec.java().display(),
                e
            ))
        })?;
        let pid = child.id();
        info!(target: PROCESS_TARGET, pid, port = spec.jetty_port(), "Jetty spawned");

        Ok(Self { child, pid })
    }

    /// Get the OS process id
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the process has already exited
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_status(), Ok(Some(_)))
    }

    /// Stop the process: SIGTERM to its group, then SIGKILL once `grace` expires
    pub async fn terminate(mut self, grace: Duration) {
        if self.has_exited() {
            debug!(target: PROCESS_TARGET, pid = self.pid, "Jetty already exited");
            return;
        }

        signal_group(self.pid, false);
        match tokio::time::timeout(grace, self.child.status()).await {
            Ok(Ok(status)) => {
                info!(target: PROCESS_TARGET, pid = self.pid, %status, "Jetty stopped");
                return;
            }
            Ok(Err(e)) => {
                warn!(target: PROCESS_TARGET, pid = self.pid, error = %e, "Error waiting for jetty");
            }
            Err(_) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid = self.pid,
                    grace_secs = grace.as_secs(),
                    "Jetty ignored SIGTERM; killing"
                );
            }
        }

        signal_group(self.pid, true);
        if let Err(e) = self.child.kill() {
            debug!(target: PROCESS_TARGET, pid = self.pid, error = %e, "Kill failed");
        }
        if tokio::time::timeout(grace, self.child.status()).await.is_err() {
            warn!(target: PROCESS_TARGET, pid = self.pid, "Jetty still not reaped after SIGKILL");
        }
    }
}

/// Arguments passed to the java binary, in launch order
pub fn launch_arguments(spec: &LaunchSpec) -> Vec<String> {
    let solr_home = spec.solr_home().to_string_lossy();
    let mut args = Vec::with_capacity(4 + spec.java_opts().len() + spec.jetty_opts().len());
    args.push(format!("-Djetty.port={}", spec.jetty_port()));
    args.push(format!("-Dsolr.solr.home={}", shell_escape(&solr_home)));
    args.extend(spec.java_opts().iter().cloned());
    args.push("-jar".to_string());
    args.push("start.jar".to_string());
    args.extend(spec.jetty_opts().iter().cloned());
    args
}

/// Escape a string for a POSIX shell by backslash-quoting unsafe characters
pub fn shell_escape(value: &str) -> Cow<'_, str> {
    fn is_safe(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ',' | ':' | '+' | '/' | '@')
    }

    if value.is_empty() {
        return Cow::Borrowed("''");
    }
    if value.chars().all(is_safe) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if c == '\n' {
            escaped.push_str("'\n'");
        } else if is_safe(c) {
            escaped.push(c);
        } else {
            escaped.push('\\');
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}

/// Force-kill a process this supervisor holds no handle for.
///
/// Failures (usually "no such process") are logged and swallowed.
pub fn kill_pid(pid: u32) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return;
        };
        if raw <= 0 {
            return;
        }
        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => info!(target: PROCESS_TARGET, pid, "Sent SIGKILL to recovered jetty"),
            Err(e) => debug!(target: PROCESS_TARGET, pid, error = %e, "SIGKILL failed"),
        }
    }

    #[cfg(not(unix))]
    {
        warn!(target: PROCESS_TARGET, pid, "Cannot signal a recovered process on this platform");
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, force: bool) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) => debug!(target: PROCESS_TARGET, pid, ?signal, "Signalled jetty process group"),
        Err(e) => debug!(target: PROCESS_TARGET, pid, ?signal, error = %e, "Failed to signal process group"),
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _force: bool) {}
