//! The `Command` collaborator interface.
//!
//! The TUI's input editor is out of scope for this crate; only the
//! interface the runtime consumes from it lives here. A real editor feeds
//! completed input lines (raw `!<plugin> <command> [arg…]` text)
//! into the runtime through this trait from its own thread; the runtime
//! tokenizes and routes them via [`crate::plugin`] and the Dispatcher.

use async_trait::async_trait;

/// A source of raw input lines, as the bottom input bar of the TUI would
/// provide once a line is submitted.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Waits for the next submitted line. Returns `None` once the source is
    /// closed (e.g. the TUI exited or stdin hit EOF), which the runtime
    /// treats as a signal to stop reading further invocations.
    async fn next_line(&self) -> Option<String>;
}

/// A [`CommandSource`] that never yields anything. Useful before a real
/// input editor is wired in, and in tests that don't drive user commands.
#[derive(Debug, Default)]
pub struct NullCommandSource;

#[async_trait]
impl CommandSource for NullCommandSource {
    async fn next_line(&self) -> Option<String> {
        std::future::pending().await
    }
}
