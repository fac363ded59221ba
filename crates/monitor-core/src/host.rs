//! The host-request wire protocol.
//!
//! Every script-to-host call a plugin coroutine makes is a tagged tuple; the
//! host replies with a status-prefixed tuple. This module defines that wire
//! shape as plain Rust types so the Script Engine, Dispatcher, and Resource
//! Broker all speak the same vocabulary without depending on `mlua`.

use crate::value::Value;
use std::fmt;

/// A request a coroutine yielded to the host.
#[derive(Debug, Clone)]
pub struct HostRequest {
    /// Fixed tag drawn from the closed set, e.g. `"serial.send"`.
    pub tag: String,
    /// Positional arguments, already unpacked from the yielded tuple.
    pub args: Vec<Value>,
}

impl HostRequest {
    pub fn new(tag: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            tag: tag.into(),
            args,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}

/// The in-band status sentinel carried by every [`HostReply`].
///
/// This is distinct from the Rust-level `thiserror` error types in
/// [`crate::error`]: a deferred host call never raises a script error, it
/// always replies with a status the script branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    Timeout,
    Cancelled,
    NotActive,
    InvalidArgument,
    IoError,
}

impl ReplyStatus {
    /// The exact wire string a script sees as the first reply element.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            ReplyStatus::Ok => "ok",
            ReplyStatus::Timeout => "timeout",
            ReplyStatus::Cancelled => "cancelled",
            ReplyStatus::NotActive => "not-active",
            ReplyStatus::InvalidArgument => "invalid-argument",
            ReplyStatus::IoError => "io-error",
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, ReplyStatus::Ok)
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// A reply to a [`HostRequest`], delivered back to the yielding coroutine.
#[derive(Debug, Clone)]
pub struct HostReply {
    pub status: ReplyStatus,
    pub results: Vec<Value>,
}

impl HostReply {
    pub fn ok(results: Vec<Value>) -> Self {
        Self {
            status: ReplyStatus::Ok,
            results,
        }
    }

    pub fn empty_ok() -> Self {
        Self::ok(Vec::new())
    }

    pub fn status(status: ReplyStatus) -> Self {
        Self {
            status,
            results: Vec::new(),
        }
    }

    pub fn timeout() -> Self {
        Self::status(ReplyStatus::Timeout)
    }

    pub fn cancelled() -> Self {
        Self::status(ReplyStatus::Cancelled)
    }

    pub fn not_active() -> Self {
        Self::status(ReplyStatus::NotActive)
    }

    pub fn invalid_argument() -> Self {
        Self::status(ReplyStatus::InvalidArgument)
    }
}
