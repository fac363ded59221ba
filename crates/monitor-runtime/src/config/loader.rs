//! Configuration file loader.

use super::error::{ConfigError, ConfigResult};
use super::schema::MonitorConfig;
use super::validation::validate_config;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader with support for multiple sources.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    /// Adds a search path for configuration files.
    pub fn add_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.add_search_path(cwd)
        } else {
            self
        }
    }

    /// Adds the user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.add_search_path(config_dir.join("monitor"))
        } else {
            self
        }
    }

    /// Loads configuration from the first available source.
    pub fn load(&self) -> ConfigResult<MonitorConfig> {
        if let Some(path) = self.find_config_file() {
            return self.load_from_file(&path);
        }

        info!("No configuration file found, using defaults");
        let config = MonitorConfig::default();
        validate_config(&config)?;
        Ok(config)
    }

    /// Loads configuration from a specific file.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<MonitorConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config = self.parse_yaml(&content)?;

        validate_config(&config)?;

        debug!(
            "Configuration loaded successfully with {} plugin director(ies)",
            config.plugin_dirs.len()
        );
        Ok(config)
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(&self, yaml: &str) -> ConfigResult<MonitorConfig> {
        let config = self.parse_yaml(yaml)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Finds the first available configuration file.
    fn find_config_file(&self) -> Option<PathBuf> {
        const CONFIG_NAMES: &[&str] = &[
            "monitor.yaml",
            "monitor.yml",
            "config.yaml",
            "config.yml",
            ".monitor.yaml",
            ".monitor.yml",
        ];

        for search_path in &self.search_paths {
            for name in CONFIG_NAMES {
                let path = search_path.join(name);
                debug!("Checking for config file: {}", path.display());
                if path.exists() {
                    info!("Found configuration file: {}", path.display());
                    return Some(path);
                }
            }
        }

        None
    }

    /// Parses YAML content with environment variable expansion.
    fn parse_yaml(&self, content: &str) -> ConfigResult<MonitorConfig> {
        let expanded = self.expand_env_vars(content);
        serde_yaml::from_str(&expanded).map_err(ConfigError::from)
    }

    /// Expands environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}.
    fn expand_env_vars(&self, content: &str) -> String {
        let mut result = content.to_string();
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(:-([^}]*))?\}").unwrap();

        for cap in re.captures_iter(content) {
            let full_match = cap.get(0).unwrap().as_str();
            let var_name = cap.get(1).unwrap().as_str();
            let default_value = cap.get(3).map(|m| m.as_str());

            let value = std::env::var(var_name)
                .ok()
                .or_else(|| default_value.map(String::from))
                .unwrap_or_default();

            result = result.replace(full_match, &value);
        }

        result
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().with_current_dir().with_user_config_dir()
    }
}

/// Convenience function to load configuration with default settings.
pub fn load_config() -> ConfigResult<MonitorConfig> {
    ConfigLoader::default().load()
}

/// Convenience function to load configuration from a specific file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<MonitorConfig> {
    ConfigLoader::new().load_from_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_yaml_falls_back_to_defaults() {
        let loader = ConfigLoader::new();
        let config = loader.load_from_str("").unwrap();
        assert!(config.plugin_dirs.is_empty());
        assert_eq!(config.event_queue_depth, 256);
    }

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
event_queue_depth: 64
log:
  level: debug
"#;
        let loader = ConfigLoader::new();
        let config = loader.load_from_str(yaml).unwrap();
        assert_eq!(config.event_queue_depth, 64);
        assert_eq!(config.log.level, super::super::schema::LogLevel::Debug);
    }

    #[test]
    fn parse_plugin_dirs() {
        let yaml = r#"
plugin_dirs:
  - /tmp
"#;
        let loader = ConfigLoader::new();
        let config = loader.load_from_str(yaml).unwrap();
        assert_eq!(config.plugin_dirs, vec![PathBuf::from("/tmp")]);
    }

    #[test]
    fn env_var_expansion() {
        // SAFETY: test runs single-threaded, no concurrent env access.
        unsafe { std::env::set_var("MONITOR_TEST_SHELL", "zsh") };
        let loader = ConfigLoader::new();

        let yaml = r#"
shell:
  program: ${MONITOR_TEST_SHELL}
"#;
        let config = loader.load_from_str(yaml).unwrap();
        assert_eq!(config.shell.program, "zsh");

        // SAFETY: test runs single-threaded, no concurrent env access.
        unsafe { std::env::remove_var("MONITOR_TEST_SHELL") };
    }

    #[test]
    fn env_var_default_value() {
        let loader = ConfigLoader::new();

        let yaml = r#"
shell:
  program: ${MONITOR_TEST_NONEXISTENT:-bash}
"#;
        let config = loader.load_from_str(yaml).unwrap();
        assert_eq!(config.shell.program, "bash");
    }

    #[test]
    fn invalid_plugin_dir_fails_validation() {
        let yaml = r#"
plugin_dirs:
  - /no/such/path/ever
"#;
        let loader = ConfigLoader::new();
        assert!(loader.load_from_str(yaml).is_err());
    }
}
