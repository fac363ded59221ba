//! The `Transport` collaborator interface.
//!
//! The serial/RTT transport drivers themselves are out of scope for this
//! crate; only the interface the Plugin Runtime consumes from them lives
//! here. A real driver implements [`Transport`] and posts [`crate::event::Event`]s
//! onto the Dispatcher's queue from its own reader thread; it never touches
//! the script thread directly.

use async_trait::async_trait;
use std::time::Duration;

/// Which transport, if any, is currently active.
///
/// Exactly one can be active at a time; routing decisions in the Dispatcher
/// are keyed off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    None,
    Serial,
    Rtt,
    Ble,
}

/// A read-only snapshot of the active transport, as `serial.info()` /
/// `rtt.info()` report it.
#[derive(Debug, Clone, Default)]
pub struct TransportInfo {
    pub port: String,
    pub baud: u32,
    pub rtt_target: String,
    pub rtt_channel: u32,
}

/// The live transport state the runtime reads and transport drivers write.
#[derive(Debug, Clone)]
pub struct TransportState {
    pub active: TransportKind,
    pub info: TransportInfo,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            active: TransportKind::None,
            info: TransportInfo::default(),
        }
    }
}

/// Errors a [`Transport`] implementation can surface. These never reach a
/// script directly; host handlers turn them into
/// [`crate::host::ReplyStatus::IoError`] or a `script-error`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("transport I/O failed: {0}")]
    Io(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// The interface the Plugin Runtime consumes from a transport driver.
///
/// Implementations are the external collaborators this crate treats as out
/// of scope; this crate
/// only depends on this trait, never on a concrete serial or RTT library.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Current transport kind and connection details.
    fn info(&self) -> TransportState;

    /// Sends bytes out over the active transport.
    async fn send(&self, bytes: &[u8]) -> TransportResult<()>;

    /// Blocks (up to `timeout`) for the next inbound frame. Used by the
    /// deferred `serial.recv` / `rtt.recv` handlers; `None` on timeout.
    async fn recv(&self, timeout: Duration) -> TransportResult<Option<Vec<u8>>>;

    /// Reads a memory-mapped region over RTT. Only meaningful when
    /// `info().active == TransportKind::Rtt`.
    async fn rtt_read(&self, address: u32, size: usize) -> TransportResult<Vec<u8>>;

    /// Connects a serial port at the given baud rate.
    async fn connect_serial(&self, port: &str, baud: u32) -> TransportResult<()>;

    /// Disconnects whichever transport is currently active.
    async fn disconnect(&self) -> TransportResult<()>;
}

/// A [`Transport`] with nothing attached: `info()` always reports
/// [`TransportKind::None`], every deferred call reports `not-connected`
/// immediately. Used before a real serial/RTT driver is wired in.
#[derive(Debug, Default)]
pub struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    fn info(&self) -> TransportState {
        TransportState::default()
    }

    async fn send(&self, _bytes: &[u8]) -> TransportResult<()> {
        Err(TransportError::NotConnected)
    }

    async fn recv(&self, _timeout: Duration) -> TransportResult<Option<Vec<u8>>> {
        Err(TransportError::NotConnected)
    }

    async fn rtt_read(&self, _address: u32, _size: usize) -> TransportResult<Vec<u8>> {
        Err(TransportError::NotConnected)
    }

    async fn connect_serial(&self, _port: &str, _baud: u32) -> TransportResult<()> {
        Err(TransportError::NotConnected)
    }

    async fn disconnect(&self) -> TransportResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_state_is_inactive() {
        let state = TransportState::default();
        assert_eq!(state.active, TransportKind::None);
        assert_eq!(state.info.port, "");
    }

    #[tokio::test]
    async fn null_transport_reports_not_connected() {
        let t = NullTransport;
        assert_eq!(t.info().active, TransportKind::None);
        assert!(t.send(b"hi").await.is_err());
        assert!(t.recv(Duration::from_millis(1)).await.is_err());
    }
}
