use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the entry used when the requested environment has none of its own.
pub const DEFAULT_ENTRY: &str = "default";

/// Bundled configuration used when an application ships no `config/jetty.yml`.
pub const BUNDLED_CONFIG: &str = include_str!("default_jetty.yml");

/// Launch options for one environment.
///
/// Every field is optional. Missing values are filled in later by the
/// resolver from caller overrides or built-in defaults.
///
/// # Examples
///
/// ```
/// use jetty_wrapper::config::LaunchOptions;
///
/// let options = LaunchOptions {
///     jetty_port: Some(8983),
///     java_opts: Some(vec!["-Xmx256m".to_string()]),
///     ..LaunchOptions::default()
/// };
/// assert_eq!(options.jetty_port, Some(8983));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Directory containing `start.jar`.
    #[serde(default)]
    pub jetty_home: Option<PathBuf>,

    /// Port Jetty listens on.
    #[serde(default)]
    pub jetty_port: Option<u16>,

    /// Seconds to wait for the port to open after spawning.
    #[serde(default)]
    pub startup_wait: Option<u64>,

    /// Solr home handed to the JVM.
    #[serde(default)]
    pub solr_home: Option<PathBuf>,

    /// Whether process output is redirected to `jettywrapper.log`.
    #[serde(default)]
    pub quiet: Option<bool>,

    /// JVM flags, in order, placed before `-jar start.jar`.
    #[serde(default)]
    pub java_opts: Option<Vec<String>>,

    /// Jetty arguments, in order, placed after `-jar start.jar`.
    #[serde(default)]
    pub jetty_opts: Option<Vec<String>>,
}

/// Per-environment Jetty configuration.
///
/// # YAML format
///
/// ```yaml
/// default:
///   jetty_port: 8888
/// test:
///   jetty_port: 8983
///   startup_wait: 30
///   java_opts:
///     - "-Xmx256m"
/// ```
///
/// # Examples
///
/// ```
/// use jetty_wrapper::config::JettyConfig;
///
/// let config = JettyConfig::parse_from_str("test:\n  jetty_port: 8983\n").unwrap();
/// assert_eq!(config.for_environment("test").and_then(|o| o.jetty_port), Some(8983));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JettyConfig {
    /// Map of environment names to their options.
    pub environments: HashMap<String, LaunchOptions>,
}

impl JettyConfig {
    /// Loads a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid YAML
    /// * The top level of the document is not a mapping
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigParse(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a YAML string.
    ///
    /// A blank document is rejected like any other non-mapping.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML config: {}", e)))?;

        let mapping = match document {
            serde_yaml::Value::Null => {
                return Err(Error::ConfigParse(
                    "Config was found, but was blank or malformed".to_string(),
                ));
            }
            serde_yaml::Value::Mapping(mapping) => mapping,
            other => {
                return Err(Error::ConfigParse(format!(
                    "Expected a mapping of environments, found {}",
                    describe(&other)
                )));
            }
        };

        let mut environments = HashMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = match key {
                serde_yaml::Value::String(name) => name,
                other => {
                    return Err(Error::ConfigParse(format!(
                        "Environment names must be strings, found {}",
                        describe(&other)
                    )));
                }
            };
            let options = match value {
                serde_yaml::Value::Null => LaunchOptions::default(),
                value => serde_yaml::from_value(value).map_err(|e| {
                    Error::ConfigParse(format!("Invalid options for '{}': {}", name, e))
                })?,
            };
            environments.insert(name, options);
        }

        Ok(Self { environments })
    }

    /// The configuration compiled into the crate.
    pub fn bundled() -> Result<Self> {
        Self::parse_from_str(BUNDLED_CONFIG)
    }

    /// Loads `path` when it exists, otherwise the bundled configuration.
    pub fn load_or_bundled(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!(file = %path.display(), "Loading Jetty configuration");
            Self::from_file(path)
        } else {
            tracing::debug!(file = %path.display(), "No Jetty configuration found; using bundled defaults");
            Self::bundled()
        }
    }

    /// Options for `environment`, falling back to the `default` entry.
    pub fn for_environment(&self, environment: &str) -> Option<&LaunchOptions> {
        self.environments
            .get(environment)
            .or_else(|| self.environments.get(DEFAULT_ENTRY))
    }
}

fn describe(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environments() {
        let config_str = r#"
default:
  jetty_port: 8888
test:
  jetty_port: 8983
  java_opts:
    - "-Xmx256m"
    - "-XX:MaxPermSize=128m"
"#;

        let config = JettyConfig::parse_from_str(config_str).unwrap();

        assert_eq!(config.environments.len(), 2);
        let test = &config.environments["test"];
        assert_eq!(test.jetty_port, Some(8983));
        assert_eq!(
            test.java_opts.as_deref(),
            Some(&["-Xmx256m".to_string(), "-XX:MaxPermSize=128m".to_string()][..])
        );
        assert_eq!(test.jetty_home, None);
    }

    #[test]
    fn test_unknown_environment_uses_default_entry() {
        let config =
            JettyConfig::parse_from_str("default:\n  jetty_port: 8888\ntest:\n  jetty_port: 8983\n")
                .unwrap();

        assert_eq!(config.for_environment("test").unwrap().jetty_port, Some(8983));
        assert_eq!(config.for_environment("staging").unwrap().jetty_port, Some(8888));
    }

    #[test]
    fn test_non_mapping_rejected() {
        let err = JettyConfig::parse_from_str("- one\n- two\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
        assert!(err.to_string().contains("a sequence"));
    }

    #[test]
    fn test_blank_document_rejected() {
        let err = JettyConfig::parse_from_str("\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
        assert!(err.to_string().contains("blank"));
    }

    #[test]
    fn test_bundled_config_parses() {
        let config = JettyConfig::bundled().unwrap();
        assert!(config.environments.contains_key(DEFAULT_ENTRY));
        assert!(config.environments.contains_key("test"));
    }
}
