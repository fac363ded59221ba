//! The `Log` collaborator interface.
//!
//! This is the plugin-visible `log.*` sink, not to be confused with the
//! host's own `tracing` instrumentation (that lives in `monitor-runtime`).
//! An implementation must be thread-safe — append-only, with per-line
//! atomicity — since concurrent plugins share one sink; implementations
//! are free to also forward lines into `tracing`.

/// Severity of a plugin-visible log line, one per `log.*` function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// The TUI's on-screen log sink, as consumed by the runtime.
///
/// `append` must be atomic per line: two concurrent callers never interleave
/// within a single line's bytes.
pub trait LogSink: Send + Sync {
    fn append(&self, plugin: &str, level: LogLevel, message: &str);
}

/// A `LogSink` that discards everything. Useful as a default before the TUI
/// wires in its real sink, and in tests that don't assert on log content.
#[derive(Debug, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn append(&self, _plugin: &str, _level: LogLevel, _message: &str) {}
}
