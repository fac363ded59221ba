//! Rust-level error types at module boundaries.
//!
//! These are distinct from [`crate::host::ReplyStatus`]: every host call in
//! this runtime is deferred and replies in-band, never raises. These
//! `thiserror` types are for Rust code that legitimately fails with `?` — a
//! broker that ran out of shell sessions, and so on.

use thiserror::Error;

/// Errors from the Resource Broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("shell session {0} not found")]
    UnknownShell(u64),
    #[error("failed to spawn shell: {0}")]
    SpawnFailed(String),
    #[error("shell I/O failed: {0}")]
    Io(String),
}
