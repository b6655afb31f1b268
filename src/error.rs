/// Error handling module for Jetty Wrapper.
///
/// This module defines the error types used throughout the library.
/// Configuration problems, start-time conflicts and PID persistence
/// failures each get their own variant so callers can react precisely.
///
/// # Example
///
/// ```
/// use jetty_wrapper::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Jetty started"),
///         Err(Error::AlreadyRunning { pid }) => println!("Jetty already running as {}", pid),
///         Err(Error::PortConflict { port }) => println!("Port {} is taken", port),
///         Err(e) if e.is_configuration() => println!("Bad configuration: {}", e),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the jetty-wrapper library.
///
/// Every fallible operation in the crate returns one of these. `stop` is the
/// exception: it never fails.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or parse the configuration source.
    ///
    /// This error occurs when:
    /// - The configuration file exists but cannot be read
    /// - The YAML is malformed
    /// - The top level of the document is not a mapping
    /// - An environment entry has fields of the wrong type
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but cannot produce a launch specification.
    ///
    /// This error occurs when:
    /// - No Jetty home is given and no application root can be discovered
    /// - The port is zero
    /// - A path option is empty
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A live process already owns the PID file.
    ///
    /// This error occurs when:
    /// - `start` finds a PID file whose process still answers a liveness probe
    #[error("Jetty already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the existing PID file.
        pid: u32,
    },

    /// The configured port is already accepting connections.
    ///
    /// This error occurs when:
    /// - A stale PID file was cleaned up but something is still bound to the port
    #[error("Port {port} is already in use")]
    PortConflict {
        /// Port from the launch specification.
        port: u16,
    },

    /// Error when spawning or signalling the Jetty process.
    ///
    /// This error occurs when:
    /// - The java binary cannot be executed
    /// - The Jetty home directory does not exist
    /// - The quiet-mode log file cannot be opened
    #[error("Server process error: {0}")]
    Process(String),

    /// Writing the PID file failed at both the canonical and the fallback location.
    #[error("Failed to write pid file '{path}': {source}")]
    PidWrite {
        /// Last location attempted.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// An operation needed a launch specification before `configure` was called.
    #[error("Not configured")]
    NotConfigured,
}

impl Error {
    /// Whether this error belongs to the configuration family.
    ///
    /// Configuration errors are fatal and never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigParse(_) | Self::ConfigInvalid(_))
    }
}

/// Result type for jetty-wrapper operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error` type
/// from this module.
pub type Result<T> = std::result::Result<T, Error>;
