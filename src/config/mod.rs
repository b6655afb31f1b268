//! Configuration module for Jetty Wrapper.
//!
//! This module handles parsing, validation and resolution of Jetty launch
//! settings. Settings come from three layers: caller overrides
//! ([`LaunchParams`]), the per-environment entries of `config/jetty.yml`
//! ([`JettyConfig`]), and built-in defaults. [`resolve`] merges them into an
//! immutable [`LaunchSpec`].
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use jetty_wrapper::config::JettyConfig;
//!
//! let config = JettyConfig::from_file("config/jetty.yml").unwrap();
//! println!("Loaded configuration with {} environments", config.environments.len());
//! ```
//!
//! Resolving a launch spec with overrides:
//!
//! ```no_run
//! use jetty_wrapper::config::{resolve, LaunchParams};
//!
//! let spec = resolve(&LaunchParams {
//!     environment: Some("test".to_string()),
//!     jetty_home: Some("/opt/jetty".into()),
//!     ..LaunchParams::default()
//! }).unwrap();
//! println!("Jetty will listen on {}", spec.url());
//! ```
mod parser;
pub mod resolver;
pub mod validator;

pub use parser::{BUNDLED_CONFIG, DEFAULT_ENTRY, JettyConfig, LaunchOptions};
pub use resolver::{LaunchParams, LaunchSpec, resolve, resolve_config};
pub use validator::{validate_config, validate_options};
