//! Plugin identity and lifecycle vocabulary shared by the loader, the
//! scheduler, and the resource broker.

use crate::event::EventKind;
use std::path::{Path, PathBuf};

/// A plugin's identity: its normalized source path.
///
/// Two different strings naming the same file (`./foo.lua` vs `foo.lua`)
/// must collide on the same `PluginId`, so the Registry is keyed by this
/// rather than the raw path string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(PathBuf);

impl PluginId {
    pub fn normalize(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let normalized = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        Self(normalized)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The plugin's display name: its basename without extension, used in
    /// `!<name> <command>` invocations and log prefixes.
    pub fn display_name(&self) -> String {
        self.0
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.to_string_lossy().into_owned())
    }
}

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The lifecycle state of a loaded plugin. A plugin that finishes
/// unloading is removed from the Registry outright rather than retained in
/// a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Loading,
    Ready,
    Failed,
    Unloading,
}

impl PluginState {
    /// A `Failed` plugin accepts no further events.
    pub fn accepts_events(self) -> bool {
        matches!(self, PluginState::Ready)
    }
}

/// What a named entry in a plugin's exported table turns out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEntryKind {
    Lifecycle(LifecycleKind),
    EventCallback(EventKind),
    UserCommand,
    /// An `on_`-prefixed name that isn't a recognized callback — logged as a
    /// warning, not fatal.
    UnknownCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    OnLoad,
    OnUnload,
}

/// Classifies an exported function name into the entry kind it represents.
///
/// Mirrors the loader's rule: reserved lifecycle and `on_*` event names are
/// recognized by exact match; anything else not starting with `on_` is a
/// user command; an unrecognized `on_*` name is a loader warning.
pub fn classify_entry_name(name: &str) -> PluginEntryKind {
    match name {
        "on_load" => return PluginEntryKind::Lifecycle(LifecycleKind::OnLoad),
        "on_unload" => return PluginEntryKind::Lifecycle(LifecycleKind::OnUnload),
        _ => {}
    }

    const EVENT_CALLBACKS: &[(&str, EventKind)] = &[
        ("on_serial_send", EventKind::SerialSend),
        ("on_serial_recv", EventKind::SerialRecv),
        ("on_serial_connect", EventKind::SerialConnect),
        ("on_serial_disconnect", EventKind::SerialDisconnect),
        ("on_rtt_send", EventKind::RttSend),
        ("on_rtt_recv", EventKind::RttRecv),
        ("on_ble_connect", EventKind::BleConnect),
        ("on_ble_disconnect", EventKind::BleDisconnect),
        ("on_ble_read", EventKind::BleRead),
        ("on_ble_write", EventKind::BleWrite),
        ("on_ble_write_nowait", EventKind::BleWriteNowait),
        ("on_ble_notify", EventKind::BleNotify),
        ("on_ble_indicate", EventKind::BleIndicate),
        ("on_mtu_change", EventKind::MtuChange),
    ];

    if let Some((_, kind)) = EVENT_CALLBACKS.iter().find(|(n, _)| *n == name) {
        return PluginEntryKind::EventCallback(*kind);
    }

    if name.starts_with("on_") {
        PluginEntryKind::UnknownCallback
    } else {
        PluginEntryKind::UserCommand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_lifecycle_entries() {
        assert_eq!(
            classify_entry_name("on_load"),
            PluginEntryKind::Lifecycle(LifecycleKind::OnLoad)
        );
        assert_eq!(
            classify_entry_name("on_unload"),
            PluginEntryKind::Lifecycle(LifecycleKind::OnUnload)
        );
    }

    #[test]
    fn recognizes_event_callbacks() {
        assert_eq!(
            classify_entry_name("on_serial_recv"),
            PluginEntryKind::EventCallback(EventKind::SerialRecv)
        );
    }

    #[test]
    fn flags_typo_like_unknown_on_names() {
        // A known drift in the source material.
        assert_eq!(
            classify_entry_name("serial_on_recv"),
            PluginEntryKind::UserCommand
        );
        assert_eq!(
            classify_entry_name("on_serial_receive"),
            PluginEntryKind::UnknownCallback
        );
    }

    #[test]
    fn anything_else_is_a_user_command() {
        assert_eq!(classify_entry_name("ping"), PluginEntryKind::UserCommand);
        assert_eq!(classify_entry_name("send_at"), PluginEntryKind::UserCommand);
    }

    #[test]
    fn plugin_id_display_name_strips_extension() {
        let id = PluginId::normalize("/tmp/does-not-exist/echo.lua");
        assert_eq!(id.display_name(), "echo");
    }
}
