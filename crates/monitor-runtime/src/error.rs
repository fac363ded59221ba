//! Runtime-boundary error type.
//!
//! Configuration errors have their own module-boundary type,
//! [`crate::config::ConfigError`]; this one covers everything else that can
//! go wrong orchestrating the runtime itself (spawning the script thread,
//! the command source, the transport) before it is wrapped in `anyhow` at
//! the top of [`crate::runtime::MonitorRuntime`].

use thiserror::Error;

/// Errors that can occur during runtime orchestration.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("script thread failed to start: {0}")]
    ScriptThreadStartup(String),

    #[error("script thread is no longer reachable")]
    ScriptThreadGone,

    #[error("{0}")]
    Other(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
