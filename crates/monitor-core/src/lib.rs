//! # Monitor Core
//!
//! Shared domain types for the Monitor Plugin Runtime: the data model
//! (`Plugin`, `Event`, `HostRequest`/`HostReply`), the external
//! collaborator interfaces (`Transport`, `Log`, `Command`), and the
//! `thiserror`-derived error types that sit at module boundaries.
//!
//! This crate has no dependency on the scripting engine (`mlua`) — it is
//! the vocabulary [`monitor_script`] and [`monitor_framework`] both speak,
//! kept deliberately small so the Script Engine can be swapped without
//! touching anything that depends on this crate.
//!
//! [`monitor_script`]: ../monitor_script/index.html
//! [`monitor_framework`]: ../monitor_framework/index.html

pub mod command;
pub mod error;
pub mod event;
pub mod host;
pub mod log;
pub mod plugin;
pub mod transport;
pub mod value;

pub use command::{CommandSource, NullCommandSource};
pub use error::BrokerError;
pub use event::{Event, EventKind, EventPayload};
pub use host::{HostReply, HostRequest, ReplyStatus};
pub use log::{LogLevel, LogSink, NullLogSink};
pub use plugin::{LifecycleKind, PluginEntryKind, PluginId, PluginState, classify_entry_name};
pub use transport::{
    NullTransport, Transport, TransportError, TransportInfo, TransportKind, TransportResult,
    TransportState,
};
pub use value::Value;
