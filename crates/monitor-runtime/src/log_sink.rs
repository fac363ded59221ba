//! Default [`LogSink`] implementations for running the Monitor without a
//! TUI attached.

use monitor_core::{LogLevel, LogSink};
use parking_lot::Mutex;
use std::io::{self, Write};

/// Writes every plugin log line to stdout, `[plugin] LEVEL message`,
/// serialized behind a mutex so concurrent `log.*` calls never interleave
/// mid-line.
pub struct StdoutLogSink {
    out: Mutex<io::Stdout>,
}

impl StdoutLogSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(io::stdout()),
        }
    }
}

impl Default for StdoutLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutLogSink {
    fn append(&self, plugin: &str, level: LogLevel, message: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "[{plugin}] {} {message}", level.as_str().to_uppercase());
    }
}

/// Mirrors every plugin log line into the host's own `tracing` output, at a
/// `tracing::Level` matching the plugin's [`LogLevel`] (`Success` maps to
/// `INFO`, `tracing` has no equivalent severity). Useful when operators
/// already collect the process's structured logs and don't want a second
/// sink to watch.
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn append(&self, plugin: &str, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(plugin, message),
            LogLevel::Info | LogLevel::Success => tracing::info!(plugin, message),
            LogLevel::Warning => tracing::warn!(plugin, message),
            LogLevel::Error => tracing::error!(plugin, message),
        }
    }
}
