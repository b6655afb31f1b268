use crate::config::{JettyConfig, LaunchOptions};
use crate::error::{Error, Result};
use std::path::Path;

/// Validates the options for a single environment
pub fn validate_options(environment: &str, options: &LaunchOptions) -> Result<()> {
    if options.jetty_port == Some(0) {
        return Err(Error::ConfigInvalid(format!(
            "Environment '{}' has jetty_port 0",
            environment
        )));
    }

    check_path(environment, "jetty_home", options.jetty_home.as_deref())?;
    check_path(environment, "solr_home", options.solr_home.as_deref())?;

    Ok(())
}

/// Validates every environment in a configuration
pub fn validate_config(config: &JettyConfig) -> Result<()> {
    for (environment, options) in &config.environments {
        validate_options(environment, options)?;
    }

    Ok(())
}

fn check_path(environment: &str, key: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) if path.as_os_str().is_empty() => Err(Error::ConfigInvalid(format!(
            "Environment '{}' has an empty {}",
            environment, key
        ))),
        _ => Ok(()),
    }
}
