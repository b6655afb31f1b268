//! Resolution of caller overrides and configuration into a [`LaunchSpec`].

use crate::config::validator::validate_options;
use crate::config::{JettyConfig, LaunchOptions};
use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Jetty port.
pub const DEFAULT_PORT: u16 = 8888;
/// Default number of seconds to wait for the port to open.
pub const DEFAULT_STARTUP_WAIT: u64 = 5;
/// Environment used when neither the caller nor the process environment names one.
pub const DEFAULT_ENVIRONMENT: &str = "development";
/// Config file location relative to the application root.
pub const CONFIG_FILE: &str = "config/jetty.yml";

const ENVIRONMENT_VAR: &str = "environment";
const APP_ROOT_VAR: &str = "APP_ROOT";
const JAVA_VAR: &str = "JAVA";
const DEFAULT_JAVA: &str = "java";

/// Caller-supplied overrides.
///
/// Anything set here wins over the configuration file.
///
/// # Examples
///
/// ```
/// use jetty_wrapper::LaunchParams;
///
/// let params = LaunchParams {
///     jetty_home: Some("/opt/jetty".into()),
///     jetty_port: Some(8983),
///     ..LaunchParams::default()
/// };
/// assert_eq!(params.jetty_port, Some(8983));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    /// Environment whose config entry is used.
    pub environment: Option<String>,
    /// Application root; also the base for runtime state.
    pub app_root: Option<PathBuf>,
    /// Explicit config file. Unlike the conventional location it must exist.
    pub config_file: Option<PathBuf>,
    /// Java binary to launch.
    pub java: Option<PathBuf>,
    /// Directory containing `start.jar`.
    pub jetty_home: Option<PathBuf>,
    /// Port Jetty listens on.
    pub jetty_port: Option<u16>,
    /// Seconds to wait for the port to open.
    pub startup_wait: Option<u64>,
    /// Redirect output to `jettywrapper.log`.
    pub quiet: Option<bool>,
    /// Solr home handed to the JVM.
    pub solr_home: Option<PathBuf>,
    /// JVM flags.
    pub java_opts: Option<Vec<String>>,
    /// Jetty arguments.
    pub jetty_opts: Option<Vec<String>>,
}

/// Everything needed to spawn and monitor one Jetty process.
///
/// Built by [`resolve`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    environment: String,
    base_path: PathBuf,
    java: PathBuf,
    jetty_home: PathBuf,
    jetty_port: u16,
    startup_wait: u64,
    quiet: bool,
    solr_home: PathBuf,
    java_opts: Vec<String>,
    jetty_opts: Vec<String>,
}

impl LaunchSpec {
    /// Environment this spec was resolved for.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Directory under which `tmp/pids` lives.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Java binary.
    pub fn java(&self) -> &Path {
        &self.java
    }

    /// Absolute Jetty home.
    pub fn jetty_home(&self) -> &Path {
        &self.jetty_home
    }

    pub fn jetty_port(&self) -> u16 {
        self.jetty_port
    }

    /// Readiness wait bound.
    pub fn startup_wait(&self) -> Duration {
        Duration::from_secs(self.startup_wait)
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn solr_home(&self) -> &Path {
        &self.solr_home
    }

    pub fn java_opts(&self) -> &[String] {
        &self.java_opts
    }

    pub fn jetty_opts(&self) -> &[String] {
        &self.jetty_opts
    }

    /// Base URL of the running server.
    pub fn url(&self) -> String {
        format!("http://localhost:{}/", self.jetty_port)
    }
}

struct Discovery {
    environment: String,
    app_root: Option<PathBuf>,
    base_path: PathBuf,
}

/// Resolves `params` against the configuration source into a [`LaunchSpec`].
///
/// # Errors
///
/// Returns a configuration error if the config file cannot be parsed, the
/// options are invalid, or no Jetty home can be determined.
pub fn resolve(params: &LaunchParams) -> Result<LaunchSpec> {
    resolve_with(params, |name| env::var(name).ok())
}

/// Merges `params` over the configuration entry for the resolved environment.
///
/// Built-in defaults are not applied; unset keys stay `None`.
pub fn resolve_config(params: &LaunchParams) -> Result<LaunchOptions> {
    let discovery = discover(params, &|name| env::var(name).ok())?;
    merged_options(params, &discovery)
}

pub(crate) fn resolve_with<F>(params: &LaunchParams, lookup: F) -> Result<LaunchSpec>
where
    F: Fn(&str) -> Option<String>,
{
    let discovery = discover(params, &lookup)?;
    let options = merged_options(params, &discovery)?;

    let jetty_home = options
        .jetty_home
        .or_else(|| discovery.app_root.as_ref().map(|root| root.join("jetty")))
        .ok_or_else(|| {
            Error::ConfigInvalid(
                "Jetty home is not set and no application root was found".to_string(),
            )
        })?;
    let jetty_home = anchor(&discovery.base_path, jetty_home);
    let solr_home = options
        .solr_home
        .unwrap_or_else(|| jetty_home.join("solr"));
    let java = params
        .java
        .clone()
        .or_else(|| lookup(JAVA_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_JAVA));

    let spec = LaunchSpec {
        environment: discovery.environment,
        base_path: discovery.base_path,
        java,
        jetty_home,
        jetty_port: options.jetty_port.unwrap_or(DEFAULT_PORT),
        startup_wait: options.startup_wait.unwrap_or(DEFAULT_STARTUP_WAIT),
        quiet: options.quiet.unwrap_or(true),
        solr_home,
        java_opts: options.java_opts.unwrap_or_default(),
        jetty_opts: options.jetty_opts.unwrap_or_default(),
    };
    tracing::debug!(
        environment = %spec.environment,
        jetty_home = %spec.jetty_home.display(),
        port = spec.jetty_port,
        "Resolved launch spec"
    );
    Ok(spec)
}

fn discover(params: &LaunchParams, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Discovery> {
    let environment = params
        .environment
        .clone()
        .or_else(|| lookup(ENVIRONMENT_VAR))
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let app_root = params
        .app_root
        .clone()
        .or_else(|| lookup(APP_ROOT_VAR).map(PathBuf::from))
        .filter(|root| !root.as_os_str().is_empty())
        .map(|root| {
            std::path::absolute(&root).map_err(|e| {
                Error::ConfigInvalid(format!(
                    "Cannot resolve application root {}: {}",
                    root.display(),
                    e
                ))
            })
        })
        .transpose()?;

    let base_path = match &app_root {
        Some(root) => root.clone(),
        None => env::current_dir().map_err(|e| {
            Error::ConfigInvalid(format!("Cannot determine working directory: {}", e))
        })?,
    };

    Ok(Discovery {
        environment,
        app_root,
        base_path,
    })
}

fn merged_options(params: &LaunchParams, discovery: &Discovery) -> Result<LaunchOptions> {
    let config = match &params.config_file {
        Some(path) => JettyConfig::from_file(path)?,
        None => JettyConfig::load_or_bundled(discovery.base_path.join(CONFIG_FILE))?,
    };
    let entry = config
        .for_environment(&discovery.environment)
        .cloned()
        .unwrap_or_default();

    let merged = LaunchOptions {
        jetty_home: params.jetty_home.clone().or(entry.jetty_home),
        jetty_port: params.jetty_port.or(entry.jetty_port),
        startup_wait: params.startup_wait.or(entry.startup_wait),
        solr_home: params.solr_home.clone().or(entry.solr_home),
        quiet: params.quiet.or(entry.quiet),
        java_opts: params.java_opts.clone().or(entry.java_opts),
        jetty_opts: params.jetty_opts.clone().or(entry.jetty_opts),
    };
    validate_options(&discovery.environment, &merged)?;
    Ok(merged)
}

fn anchor(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn app_with_config(yaml: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("config")).unwrap();
        fs::write(root.path().join(CONFIG_FILE), yaml).unwrap();
        root
    }

    #[test]
    fn test_builtin_defaults() {
        let root = app_with_config("{}\n");
        let params = LaunchParams {
            app_root: Some(root.path().to_path_buf()),
            ..LaunchParams::default()
        };

        let spec = resolve_with(&params, no_env).unwrap();

        assert_eq!(spec.jetty_port(), DEFAULT_PORT);
        assert_eq!(spec.startup_wait(), Duration::from_secs(5));
        assert!(spec.quiet());
        assert!(spec.java_opts().is_empty());
        assert!(spec.jetty_opts().is_empty());
        assert_eq!(spec.jetty_home(), root.path().join("jetty"));
        assert_eq!(spec.solr_home(), root.path().join("jetty").join("solr"));
        assert_eq!(spec.java(), Path::new("java"));
        assert_eq!(spec.environment(), DEFAULT_ENVIRONMENT);
    }

    #[test]
    fn test_environment_variable_selects_entry() {
        let root = app_with_config("default:\n  jetty_port: 8888\ntest:\n  jetty_port: 8983\n");
        let params = LaunchParams {
            app_root: Some(root.path().to_path_buf()),
            ..LaunchParams::default()
        };

        let spec = resolve_with(&params, |name| {
            (name == ENVIRONMENT_VAR).then(|| "test".to_string())
        })
        .unwrap();

        assert_eq!(spec.environment(), "test");
        assert_eq!(spec.jetty_port(), 8983);
    }

    #[test]
    fn test_app_root_from_environment_variable() {
        let root = app_with_config("{}\n");
        let root_str = root.path().to_string_lossy().into_owned();

        let spec = resolve_with(&LaunchParams::default(), |name| {
            (name == APP_ROOT_VAR).then(|| root_str.clone())
        })
        .unwrap();

        assert_eq!(spec.base_path(), root.path());
        assert_eq!(spec.jetty_home(), root.path().join("jetty"));
    }

    #[test]
    fn test_java_override_from_environment_variable() {
        let root = app_with_config("{}\n");
        let params = LaunchParams {
            app_root: Some(root.path().to_path_buf()),
            ..LaunchParams::default()
        };

        let spec = resolve_with(&params, |name| {
            (name == JAVA_VAR).then(|| "/opt/jdk/bin/java".to_string())
        })
        .unwrap();

        assert_eq!(spec.java(), Path::new("/opt/jdk/bin/java"));
    }

    #[test]
    fn test_params_override_config_entry() {
        let root = app_with_config(
            "test:\n  jetty_port: 8983\n  startup_wait: 30\n  java_opts: [\"-Xmx1g\"]\n",
        );
        let params = LaunchParams {
            environment: Some("test".to_string()),
            app_root: Some(root.path().to_path_buf()),
            jetty_port: Some(9999),
            ..LaunchParams::default()
        };

        let spec = resolve_with(&params, no_env).unwrap();

        assert_eq!(spec.jetty_port(), 9999);
        assert_eq!(spec.startup_wait(), Duration::from_secs(30));
        assert_eq!(spec.java_opts().to_vec(), vec!["-Xmx1g".to_string()]);
    }

    #[test]
    fn test_missing_home_without_app_root_fails() {
        let root = app_with_config("{}\n");
        let params = LaunchParams {
            config_file: Some(root.path().join(CONFIG_FILE)),
            ..LaunchParams::default()
        };

        let err = resolve_with(&params, no_env).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn test_relative_home_anchored_at_base() {
        let root = app_with_config("{}\n");
        let params = LaunchParams {
            app_root: Some(root.path().to_path_buf()),
            jetty_home: Some(PathBuf::from("vendor/jetty")),
            ..LaunchParams::default()
        };

        let spec = resolve_with(&params, no_env).unwrap();
        assert_eq!(spec.jetty_home(), root.path().join("vendor/jetty"));
    }

    #[test]
    fn test_zero_port_rejected() {
        let root = app_with_config("default:\n  jetty_port: 0\n");
        let params = LaunchParams {
            app_root: Some(root.path().to_path_buf()),
            ..LaunchParams::default()
        };

        let err = resolve_with(&params, no_env).unwrap_err();
        assert!(err.is_configuration());
    }
}
