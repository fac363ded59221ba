//! Configuration module for the Monitor runtime.
//!
//! This provides YAML-based configuration loading and validation for the
//! plugin directories, event queue depth, `Shell` defaults, and host-side
//! logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{LogConfig, LogLevel, MonitorConfig, ShellConfig};
pub use validation::validate_config;
