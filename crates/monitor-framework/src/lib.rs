//! # Monitor Framework
//!
//! The Plugin Loader & Registry, the Event Dispatcher & Coroutine
//! Scheduler, and the Resource Broker — the three components
//! built directly on top of [`monitor_core`]'s vocabulary and
//! [`monitor_script`]'s Lua glue.
//!
//! This layer owns every process-wide singleton the runtime crate starts up:
//! the [`Registry`] of loaded plugins, the bounded [`EventQueue`], and the
//! [`ResourceBroker`]. None of it is reachable from plugin code directly
//! — only [`Dispatcher`] and the
//! `monitor-runtime` crate that drives it hold references.

pub mod broker;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod registry;

pub use broker::ResourceBroker;
pub use command::{Invocation, parse_invocation, shell_split};
pub use dispatcher::Dispatcher;
pub use error::{LoadError, LoadResult};
pub use handlers::Handlers;
pub use queue::EventQueue;
pub use registry::{PluginRecord, Registry};
