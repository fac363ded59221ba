//! Configuration schema for the Monitor runtime.
//!
//! This is distinct from anything a plugin script can read or write: it is
//! the host's own startup configuration, parsed once before the Dispatcher,
//! Registry, and Resource Broker are constructed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the Monitor runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directories scanned for `*.lua` plugin files at startup.
    pub plugin_dirs: Vec<PathBuf>,

    /// Bound for the Dispatcher's event queue.
    #[serde(default = "default_event_queue_depth")]
    pub event_queue_depth: usize,

    /// `Shell` session defaults.
    pub shell: ShellConfig,

    /// Host-side (`tracing`) logging configuration.
    pub log: LogConfig,
}

fn default_event_queue_depth() -> usize {
    256
}

/// `Shell.new()` / `shell:run()` defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// The program spawned for every `Shell` session. Defaults to
    /// `cmd.exe` on Windows, the user's `$SHELL` (or `sh`) elsewhere.
    pub program: String,

    /// Default deadline for `shell:run()` when `opts.timeout_ms` is
    /// omitted.
    pub timeout_ms_default: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_shell_program(),
            timeout_ms_default: 5_000,
        }
    }
}

fn default_shell_program() -> String {
    if cfg!(windows) {
        "cmd.exe".to_string()
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string())
    }
}

/// Host-side logging configuration, forwarded to [`crate::logging::LoggingBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum severity tracked, absent `RUST_LOG` override.
    pub level: LogLevel,

    /// Extra `tracing_subscriber::EnvFilter` directives, e.g.
    /// `"monitor_framework=debug"`.
    pub directive: Option<String>,

    /// Optional file to additionally append logs to. Forwarded to
    /// [`crate::logging::LoggingBuilder::with_file_path`], which writes
    /// through a non-blocking `tracing-appender` writer.
    pub file_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            directive: None,
            file_path: None,
        }
    }
}

/// Log level enum, mirrors [`tracing::Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
