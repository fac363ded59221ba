//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::MonitorConfig;

/// Validates a loaded [`MonitorConfig`], returning a descriptive error for
/// the first problem found.
pub fn validate_config(config: &MonitorConfig) -> ConfigResult<()> {
    if config.event_queue_depth == 0 {
        return Err(ConfigError::validation(
            "event_queue_depth must be greater than zero",
        ));
    }

    for dir in &config.plugin_dirs {
        if !dir.exists() {
            return Err(ConfigError::validation(format!(
                "plugin directory does not exist: {}",
                dir.display()
            )));
        }
        if !dir.is_dir() {
            return Err(ConfigError::validation(format!(
                "plugin directory is not a directory: {}",
                dir.display()
            )));
        }
    }

    if config.shell.program.trim().is_empty() {
        return Err(ConfigError::missing_field("shell.program"));
    }

    if config.shell.timeout_ms_default == 0 {
        return Err(ConfigError::validation(
            "shell.timeout_ms_default must be greater than zero",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&MonitorConfig::default()).is_ok());
    }

    #[test]
    fn zero_queue_depth_is_rejected() {
        let mut config = MonitorConfig::default();
        config.event_queue_depth = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_plugin_dir_is_rejected() {
        let mut config = MonitorConfig::default();
        config.plugin_dirs.push("/no/such/path/ever".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn empty_shell_program_is_rejected() {
        let mut config = MonitorConfig::default();
        config.shell.program.clear();
        assert!(validate_config(&config).is_err());
    }
}
