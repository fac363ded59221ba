//! The event model.
//!
//! Events are synthesized by transport drivers, the timer wheel, and the
//! command parser, then posted onto the Dispatcher's bounded queue. Each
//! carries the data its matching plugin callback expects plus a
//! monotonic sequence number used to prove per-plugin ordering.

use std::time::Instant;

/// The callback an event targets, one-to-one with the `on_*` entry names
/// a plugin table can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SerialSend,
    SerialRecv,
    SerialConnect,
    SerialDisconnect,
    RttSend,
    RttRecv,
    BleConnect,
    BleDisconnect,
    BleRead,
    BleWrite,
    BleWriteNowait,
    BleNotify,
    BleIndicate,
    MtuChange,
}

impl EventKind {
    /// The `on_*` callback name a [`crate::plugin::PluginEntry`] registers
    /// under for this event kind.
    pub fn callback_name(self) -> &'static str {
        match self {
            EventKind::SerialSend => "on_serial_send",
            EventKind::SerialRecv => "on_serial_recv",
            EventKind::SerialConnect => "on_serial_connect",
            EventKind::SerialDisconnect => "on_serial_disconnect",
            EventKind::RttSend => "on_rtt_send",
            EventKind::RttRecv => "on_rtt_recv",
            EventKind::BleConnect => "on_ble_connect",
            EventKind::BleDisconnect => "on_ble_disconnect",
            EventKind::BleRead => "on_ble_read",
            EventKind::BleWrite => "on_ble_write",
            EventKind::BleWriteNowait => "on_ble_write_nowait",
            EventKind::BleNotify => "on_ble_notify",
            EventKind::BleIndicate => "on_ble_indicate",
            EventKind::MtuChange => "on_mtu_change",
        }
    }

    /// Whether this event kind belongs to the serial transport family.
    pub fn is_serial(self) -> bool {
        matches!(
            self,
            EventKind::SerialSend
                | EventKind::SerialRecv
                | EventKind::SerialConnect
                | EventKind::SerialDisconnect
        )
    }

    /// Whether this event kind belongs to the RTT transport family.
    pub fn is_rtt(self) -> bool {
        matches!(self, EventKind::RttSend | EventKind::RttRecv)
    }

    /// Whether this event kind belongs to the BLE transport family.
    pub fn is_ble(self) -> bool {
        matches!(
            self,
            EventKind::BleConnect
                | EventKind::BleDisconnect
                | EventKind::BleRead
                | EventKind::BleWrite
                | EventKind::BleWriteNowait
                | EventKind::BleNotify
                | EventKind::BleIndicate
                | EventKind::MtuChange
        )
    }
}

/// The payload carried by an event, shaped to match the arguments its
/// callback receives.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// `on_serial_send`/`on_serial_recv`/`on_rtt_send`/`on_rtt_recv` — raw
    /// bytes delivered to the script as a byte array.
    Bytes(Vec<u8>),
    /// `on_serial_connect`/`on_serial_disconnect`.
    SerialTransition { port: String, baud: u32 },
    /// `on_ble_connect`/`on_ble_disconnect`.
    BleUuid { uuid: String },
    /// `on_ble_read`/`on_ble_write`/`on_ble_write_nowait`/`on_ble_notify`/
    /// `on_ble_indicate`.
    BleCharacteristic {
        service: String,
        characteristic: String,
        value: Vec<u8>,
    },
    /// `on_mtu_change`.
    MtuChange { uuid: String, mtu: u32 },
    /// No payload beyond the kind itself (reserved for future callbacks).
    None,
}

/// A single occurrence the Dispatcher fans out to interested plugins.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub payload: EventPayload,
    /// Assigned by the Dispatcher at enqueue time; strictly increasing.
    pub seq: u64,
    pub arrived_at: Instant,
}

impl Event {
    pub fn new(kind: EventKind, payload: EventPayload, seq: u64) -> Self {
        Self {
            kind,
            payload,
            seq,
            arrived_at: Instant::now(),
        }
    }
}
