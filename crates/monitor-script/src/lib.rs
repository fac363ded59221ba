//! # Monitor Script
//!
//! The Lua Script Engine: loading plugin scripts, providing
//! their `scope`/`shell` host API stubs, and driving their coroutines
//! through the yield/resume protocol.
//!
//! This crate never touches a transport, a shell subprocess, or a regex
//! cache directly — it only knows how to run Lua and translate between
//! `mlua` values and [`monitor_core::Value`]. The Dispatcher and Resource
//! Broker in `monitor-framework` own the actual side effects and feed their
//! results back in as [`monitor_core::HostReply`]s.

pub mod convert;
pub mod engine;
pub mod error;
pub mod stdlib;
pub mod task;

pub use engine::{LoadedScript, ScriptEngine};
pub use error::{ScriptError, ScriptResult};
pub use task::{Resumption, TaskCoroutine};
