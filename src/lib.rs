/*!
 # Jetty Wrapper

 A Rust library for running a local Jetty servlet container around tests or
 deployment tasks.

 ## Overview

 Jetty Wrapper provides functionality to:
 - Resolve launch settings from `config/jetty.yml`, environment entries and overrides
 - Start Jetty as a detached process and wait for its port to open
 - Record the process id on disk so a crashed supervisor can clean up later
 - Stop Jetty gracefully, or forcefully when only the PID file survives
 - Wrap a unit of work so Jetty is always stopped afterwards

 ## Basic Usage

 ```no_run
 use jetty_wrapper::{JettyWrapper, LaunchParams, Result};

 #[tokio::main]
 async fn main() -> Result<()> {
     let mut jetty = JettyWrapper::new();
     let params = LaunchParams {
         environment: Some("test".to_string()),
         jetty_home: Some("/opt/hydra-jetty".into()),
         ..LaunchParams::default()
     };

     let outcome: Result<usize> = jetty
         .wrap(params, |spec| async move {
             println!("Jetty is up at {}", spec.url());
             Ok::<_, jetty_wrapper::Error>(42)
         })
         .await;

     println!("unit of work returned {}", outcome?);
     assert!(!jetty.is_running());
     Ok(())
 }
 ```

 ## Features

 - **Crash recovery**: stale PID files are detected with a liveness probe and removed
 - **Readiness wait**: bounded TCP polling, downgraded to a warning on timeout
 - **Guaranteed cleanup**: `wrap` stops Jetty even when the unit of work fails or panics
 - **Structured logging**: every step is reported through `tracing`

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod config;
pub mod error;
pub mod server;

pub use config::{LaunchParams, LaunchSpec, resolve_config};
pub use error::{Error, Result};
pub use server::{LifecycleEvent, LifecycleRecord, ServerStatus, SessionId};

use futures::FutureExt;
use server::{JettyProcess, LifecycleLog, PidStore, PROCESS_TARGET};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Mutex;

/// Time Jetty gets to exit after SIGTERM before it is killed.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Session {
    id: SessionId,
    spec: LaunchSpec,
    pids: PidStore,
}

/// Supervises a single Jetty process.
///
/// A `JettyWrapper` holds at most one launch spec and at most one live
/// process handle. Calling [`configure`](Self::configure) replaces both; the
/// previous process, if any, is left running, so call [`stop`](Self::stop)
/// first to get rid of it.
/// All public methods are instrumented with `tracing` spans.
pub struct JettyWrapper {
    /// Current launch spec and its pid locations
    session: Option<Session>,
    /// Handle to the process spawned in this session
    process: Option<JettyProcess>,
    /// State machine position
    status: ServerStatus,
    /// Lifecycle history across sessions
    events: LifecycleLog,
}

impl JettyWrapper {
    /// Create an unconfigured supervisor
    pub fn new() -> Self {
        Self {
            session: None,
            process: None,
            status: ServerStatus::Idle,
            events: LifecycleLog::new(),
        }
    }

    /// Resolve `params` into a fresh launch spec and make it current
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub fn configure(&mut self, params: LaunchParams) -> Result<&LaunchSpec> {
        let spec = config::resolve(&params)?;
        let pids = PidStore::for_spec(&spec)?;

        if let Some(process) = self.process.take() {
            tracing::warn!(
                target: PROCESS_TARGET,
                pid = process.pid(),
                "Reconfiguring without stop; previous jetty left running"
            );
        }

        let id = SessionId::new();
        self.events.record(
            id,
            LifecycleEvent::Configured,
            Some(format!("{} on port {}", spec.jetty_home().display(), spec.jetty_port())),
        );
        self.status = ServerStatus::Idle;
        tracing::info!(session = %id, environment = spec.environment(), "Configured jetty");

        let session = self.session.insert(Session { id, spec, pids });
        Ok(&session.spec)
    }

    /// Start Jetty for the current launch spec
    ///
    /// Refuses to start when the PID file names a live process. A stale PID
    /// file is removed, after which the port must be free. Waiting for the
    /// port is bounded by the spec's startup wait and a timeout only logs.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(session = tracing::field::Empty))]
    pub async fn start(&mut self) -> Result<()> {
        let session = self.session.as_ref().ok_or(Error::NotConfigured)?;
        let id = session.id;
        let spec = session.spec.clone();
        let pids = session.pids.clone();
        tracing::Span::current().record("session", tracing::field::display(id));

        if let Some(path) = pids.locate() {
            let pid = server::pid::read_pid(path).unwrap_or(0);
            if pid != 0 && server::is_process_alive(pid) {
                tracing::info!(target: PROCESS_TARGET, pid, "Refusing to start: jetty already running");
                return Err(Error::AlreadyRunning { pid });
            }

            tracing::warn!(
                target: PROCESS_TARGET,
                pid,
                file = %path.display(),
                "Removing stale pid file"
            );
            pids.delete();
            self.events
                .record(id, LifecycleEvent::StaleRecovered, Some(format!("pid {}", pid)));

            if server::is_port_open(spec.jetty_port()).await {
                tracing::error!(target: PROCESS_TARGET, port = spec.jetty_port(), "Port already in use");
                return Err(Error::PortConflict {
                    port: spec.jetty_port(),
                });
            }
        }

        self.status = ServerStatus::Starting;
        let process = match JettyProcess::spawn(&spec) {
            Ok(process) => process,
            Err(e) => {
                tracing::error!(error = %e, "Failed to spawn jetty");
                self.status = ServerStatus::Idle;
                return Err(e);
            }
        };

        let pid = process.pid();
        let pid_path = match pids.write(pid) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist pid; killing jetty");
                process.terminate(Duration::from_secs(1)).await;
                self.status = ServerStatus::Idle;
                return Err(e);
            }
        };
        self.process = Some(process);
        self.events.record(
            id,
            LifecycleEvent::Started,
            Some(format!("pid {} ({})", pid, pid_path.display())),
        );

        if server::startup_wait(spec.jetty_port(), spec.startup_wait()).await {
            self.events.record(id, LifecycleEvent::Ready, None);
        } else {
            self.events.record(
                id,
                LifecycleEvent::ReadinessTimedOut,
                Some(format!("waited {}s", spec.startup_wait().as_secs())),
            );
        }
        self.status = ServerStatus::Running;

        tracing::info!(pid, url = %spec.url(), "Jetty started");
        Ok(())
    }

    /// Stop Jetty if the PID file says one may be running
    ///
    /// Never fails: signalling a process that is already gone and removing a
    /// missing PID file are both ignored.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&mut self) {
        let Some(session) = self.session.as_ref() else {
            tracing::debug!("Not configured; nothing to stop");
            return;
        };
        let id = session.id;
        let pids = session.pids.clone();

        let Some(pid) = pids.read() else {
            tracing::debug!(target: PROCESS_TARGET, "No pid file; nothing to stop");
            return;
        };

        self.status = ServerStatus::Stopping;
        match self.process.take() {
            Some(process) => process.terminate(STOP_GRACE).await,
            None if pid != 0 => server::kill_pid(pid),
            None => {}
        }
        pids.delete();

        self.status = ServerStatus::Idle;
        self.events
            .record(id, LifecycleEvent::Stopped, Some(format!("pid {}", pid)));
        tracing::info!(target: PROCESS_TARGET, pid, "Jetty stopped");
    }

    /// Run `work` with Jetty started for `params`, stopping Jetty afterwards
    ///
    /// Configuration errors are returned before anything starts. After that,
    /// `stop` always runs, whether start fails, `work` returns an error, or
    /// `work` panics. The first error (or the panic) is passed on once Jetty
    /// is down. `work` receives a copy of the launch spec.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, work))]
    pub async fn wrap<T, E, F, Fut>(
        &mut self,
        params: LaunchParams,
        work: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(LaunchSpec) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let spec = self.configure(params)?.clone();

        let outcome = match self.start().await {
            Ok(()) => AssertUnwindSafe(async move { work(spec).await })
                .catch_unwind()
                .await,
            Err(e) => Ok(Err(E::from(e))),
        };

        self.stop().await;

        match outcome {
            Ok(result) => result,
            Err(payload) => {
                tracing::error!("Unit of work panicked; jetty stopped");
                panic::resume_unwind(payload)
            }
        }
    }

    /// Whether the PID file names a live process
    pub fn is_running(&self) -> bool {
        self.pid().is_some_and(server::is_process_alive)
    }

    /// The PID recorded on disk, if any
    pub fn pid(&self) -> Option<u32> {
        self.session
            .as_ref()
            .and_then(|session| session.pids.read())
            .filter(|pid| *pid != 0)
    }

    /// Current launch spec
    pub fn launch_spec(&self) -> Option<&LaunchSpec> {
        self.session.as_ref().map(|session| &session.spec)
    }

    /// Id of the current session
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    /// Canonical PID file location for the current launch spec
    pub fn pid_path(&self) -> Option<&Path> {
        self.session
            .as_ref()
            .map(|session| session.pids.primary_path())
    }

    /// Base URL of the configured Jetty
    pub fn url(&self) -> Option<String> {
        self.launch_spec().map(LaunchSpec::url)
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Recent lifecycle events, newest first
    pub fn events(&self, limit: Option<usize>) -> Vec<LifecycleRecord> {
        self.events.all_events(limit)
    }

    /// Recent lifecycle events for the current session, newest first
    pub fn session_events(&self, limit: Option<usize>) -> Vec<LifecycleRecord> {
        match self.session_id() {
            Some(id) => self.events.session_events(id, limit),
            None => Vec::new(),
        }
    }

    /// Most recent lifecycle event of the current session
    pub fn last_event(&self) -> Option<LifecycleEvent> {
        self.session_id().and_then(|id| self.events.last_event(id))
    }
}

impl Default for JettyWrapper {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_WRAPPER: OnceLock<Mutex<JettyWrapper>> = OnceLock::new();

/// The process-wide default supervisor used by the free functions below
pub fn global() -> &'static Mutex<JettyWrapper> {
    DEFAULT_WRAPPER.get_or_init(|| Mutex::new(JettyWrapper::new()))
}

/// Configure the default supervisor and return a copy of its launch spec
pub async fn configure(params: LaunchParams) -> Result<LaunchSpec> {
    let mut wrapper = global().lock().await;
    wrapper.configure(params).cloned()
}

/// Configure the default supervisor and start Jetty
pub async fn start(params: LaunchParams) -> Result<()> {
    let mut wrapper = global().lock().await;
    wrapper.configure(params)?;
    wrapper.start().await
}

/// Stop the Jetty described by `params`
///
/// Reconfiguring drops any live handle, so the process is killed by PID.
/// A configuration error means there is nothing identifiable to stop.
pub async fn stop(params: LaunchParams) {
    let mut wrapper = global().lock().await;
    let configured = wrapper.configure(params).map(|_| ());
    match configured {
        Ok(()) => wrapper.stop().await,
        Err(e) => tracing::warn!(error = %e, "Cannot resolve jetty to stop"),
    }
}

/// Start Jetty on the default supervisor, run `work`, then stop Jetty
///
/// The default supervisor stays locked while `work` runs, so `work` must not
/// call the other free functions in this module.
pub async fn wrap<T, E, F, Fut>(params: LaunchParams, work: F) -> std::result::Result<T, E>
where
    F: FnOnce(LaunchSpec) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<Error>,
{
    let mut wrapper = global().lock().await;
    wrapper.wrap(params, work).await
}

/// Whether the Jetty described by `params` is running
pub async fn is_running(params: LaunchParams) -> Result<bool> {
    let mut wrapper = global().lock().await;
    wrapper.configure(params)?;
    Ok(wrapper.is_running())
}

/// PID of the Jetty described by `params`, if one was recorded
pub async fn pid(params: LaunchParams) -> Result<Option<u32>> {
    let mut wrapper = global().lock().await;
    wrapper.configure(params)?;
    Ok(wrapper.pid())
}
