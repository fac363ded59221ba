//! Monitor Runtime — orchestration layer for the plugin runtime.
//!
//! This crate provides:
//! - Configuration loading and validation (`config`)
//! - Host-side logging setup built on `tracing`/`tracing-subscriber` (`logging`)
//! - Default [`monitor_core::LogSink`] and [`monitor_core::CommandSource`]
//!   implementations for running without a TUI attached (`log_sink`,
//!   `command_source`)
//! - [`MonitorRuntime`], which owns the script thread, the event queue, and
//!   process lifecycle (Ctrl+C / SIGTERM shutdown)
//!
//! ```ignore
//! use monitor_runtime::{MonitorRuntime, MonitorConfig, StdoutLogSink, StdinCommandSource};
//! use monitor_core::NullTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MonitorConfig::default();
//!     let runtime = Arc::new(MonitorRuntime::new(
//!         config,
//!         Arc::new(NullTransport),
//!         Arc::new(StdoutLogSink::new()),
//!         Arc::new(StdinCommandSource::new()),
//!     ));
//!     runtime.run().await
//! }
//! ```

pub mod command_source;
pub mod config;
pub mod error;
pub mod log_sink;
pub mod logging;
pub mod runtime;

// Re-exports
pub use command_source::StdinCommandSource;
pub use config::{ConfigError, ConfigResult, MonitorConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use log_sink::{StdoutLogSink, TracingLogSink};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::MonitorRuntime;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
