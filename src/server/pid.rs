//! PID file persistence.
//!
//! The PID file is the only durable record that a Jetty process may still be
//! running. Writes go through a temporary file that is renamed into place, so
//! monitoring scripts reading the file never see partial content.

use crate::config::LaunchSpec;
use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, info, warn};

use super::PROCESS_TARGET;

const PID_SUFFIX: &str = ".pid";
/// Readable by monitoring tools running as other users.
#[cfg(unix)]
const PID_FILE_MODE: u32 = 0o644;

/// Canonical and fallback PID file locations for one Jetty home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidStore {
    primary: PathBuf,
    fallback: PathBuf,
}

impl PidStore {
    /// Derives the PID locations for `jetty_home` under `base_path`.
    ///
    /// The canonical file lives in `<base>/tmp/pids`, the fallback in `<base>/tmp`.
    pub fn new(base_path: &Path, jetty_home: &Path) -> Result<Self> {
        let filename = to_filename(jetty_home)?;
        let tmp = base_path.join("tmp");
        Ok(Self {
            primary: tmp.join("pids").join(&filename),
            fallback: tmp.join(filename),
        })
    }

    /// PID locations for a resolved launch spec.
    pub fn for_spec(spec: &LaunchSpec) -> Result<Self> {
        Self::new(spec.base_path(), spec.jetty_home())
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn fallback_path(&self) -> &Path {
        &self.fallback
    }

    /// The existing PID file, preferring the canonical location.
    pub fn locate(&self) -> Option<&Path> {
        [self.primary.as_path(), self.fallback.as_path()]
            .into_iter()
            .find(|path| path.is_file())
    }

    /// PID recorded in whichever file [`locate`](Self::locate) finds.
    pub fn read(&self) -> Option<u32> {
        self.locate().and_then(read_pid)
    }

    /// Writes `pid` at the canonical location, falling back if that fails.
    ///
    /// Returns the path that was written.
    pub fn write(&self, pid: u32) -> Result<PathBuf> {
        match write_pid(&self.primary, pid) {
            Ok(()) => {
                info!(target: PROCESS_TARGET, pid, file = %self.primary.display(), "pid file written");
                Ok(self.primary.clone())
            }
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.primary.display(),
                    error = %error,
                    "cannot write pid file; trying fallback location"
                );
                write_pid(&self.fallback, pid).map_err(|source| Error::PidWrite {
                    path: self.fallback.clone(),
                    source,
                })?;
                info!(target: PROCESS_TARGET, pid, file = %self.fallback.display(), "pid file written");
                Ok(self.fallback.clone())
            }
        }
    }

    /// Removes the PID file from both locations, ignoring failures.
    pub fn delete(&self) {
        delete_pid(&self.primary);
        delete_pid(&self.fallback);
    }
}

/// Maps a Jetty home to its PID file name.
///
/// Path separators become underscores and `.pid` is appended, so
/// `/usr/local/jetty1` maps to `_usr_local_jetty1.pid`.
pub fn to_filename(jetty_home: &Path) -> Result<String> {
    let home = jetty_home.to_string_lossy();
    if home.is_empty() {
        return Err(Error::ConfigInvalid(
            "Cannot derive a pid file name from an empty Jetty home".to_string(),
        ));
    }
    let mut name: String = home
        .chars()
        .map(|c| if c == '/' || c == MAIN_SEPARATOR { '_' } else { c })
        .collect();
    name.push_str(PID_SUFFIX);
    Ok(name)
}

/// Reads the PID on the first line of `path`.
///
/// Missing files yield `None`; unparsable content yields `Some(0)`, which
/// callers treat as "not running".
pub fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    let pid = content
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<u32>().ok())
        .unwrap_or(0);
    Some(pid)
}

/// Atomically writes `pid` as the sole line of `path`, creating the parent directory.
pub fn write_pid(path: &Path, pid: u32) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "pid path did not have a parent directory",
        )
    })?;
    fs::create_dir_all(directory)?;

    let mut file = Builder::new()
        .prefix(
            path.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("jetty"),
        )
        .tempfile_in(directory)?;
    // fchmod is not subject to the umask.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(PID_FILE_MODE))?;
    }
    writeln!(file, "{pid}")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// Removes `path`; a missing file is not an error and other failures are only logged.
pub fn delete_pid(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(target: PROCESS_TARGET, file = %path.display(), "pid file removed"),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => debug!(
            target: PROCESS_TARGET,
            file = %path.display(),
            error = %error,
            "failed to remove pid file"
        ),
    }
}
