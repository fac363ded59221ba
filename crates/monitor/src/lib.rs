//! # Monitor
//!
//! A cross-platform, terminal-based serial/RTT monitor's plugin runtime:
//! an event-driven host that loads user Lua scripts, dispatches
//! I/O and lifecycle events to them, lets them call back into the Monitor
//! through a syscall-like request/response protocol, and manages their
//! concurrency, cancellation, and failure isolation.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌────────────┐     ┌───────────┐
//! │ Transport │────▶│ Dispatcher │────▶│  coroutine │────▶│  Resource │
//! │  (serial, │     │ (event     │     │  (one per  │     │  Broker   │
//! │   RTT)    │     │  queue +   │     │   Task)    │     │ (Shell,   │
//! └───────────┘     │  scheduler)│     └────────────┘     │  patterns)│
//!                    └────────────┘            │          └───────────┘
//!                                               ▼
//!                                          `log`/`fmt`/`serial`/
//!                                          `rtt`/`sys`/`re` host API
//! ```
//!
//! - **[`monitor_core`]**: the shared vocabulary — `Event`, `HostRequest`/
//!   `HostReply`, `Plugin`/`Task` state, and the `Transport`/`Log`/
//!   `CommandSource` interfaces the runtime consumes from its external
//!   collaborators.
//! - **[`monitor_script`]**: the Script Engine and Host API Surface —
//!   an embedded Lua interpreter plus the `scope`/`shell` stubs.
//! - **[`monitor_framework`]**: the Plugin Loader & Registry, the
//!   Event Dispatcher & Coroutine Scheduler, and the Resource Broker.
//! - **[`monitor_runtime`]**: configuration, host-side logging, and process
//!   lifecycle — the glue that wires the above into a running process.
//!
//! This crate is a thin facade: it pulls the four layers together and
//! re-exports the types an embedder needs, the way a terminal UI binary
//! built on top of it would.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use monitor::prelude::*;
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

// Shared domain vocabulary.
pub use monitor_core;

// The Lua Script Engine and Host API Surface.
pub use monitor_script;

// The Plugin Loader, Dispatcher, and Resource Broker.
pub use monitor_framework;

// Configuration, logging, and process lifecycle.
pub use monitor_runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use monitor::prelude::*;
/// ```
pub mod prelude {
    // Runtime — main entry point
    pub use monitor_runtime::{MonitorConfig, MonitorRuntime, StdinCommandSource, StdoutLogSink};

    // Core vocabulary for building a host embedding
    pub use monitor_core::{
        CommandSource, Event, EventKind, LogSink, NullCommandSource, NullLogSink, NullTransport,
        PluginId, Transport,
    };

    // Plugin loading and dispatch, for embedders that want direct control
    // instead of going through `MonitorRuntime`.
    pub use monitor_framework::{Dispatcher, EventQueue, Registry, ResourceBroker};
}
