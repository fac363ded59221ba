//! The Event Dispatcher & Coroutine Scheduler, plus the Plugin
//! Loader it shares a thread and a [`Registry`] with.
//!
//! Both are confined to one OS thread — "the script thread" — since
//! `mlua`'s types are not `Send`. This dispatcher runs inside a
//! `tokio::task::LocalSet` and uses `Rc<RefCell<_>>` rather than `Arc<Mutex<_>>`
//! for anything that only the script thread ever touches; genuinely shared
//! state (the [`ResourceBroker`], the `Transport`, the `Log` sink) stays
//! behind `Arc` because those are used by other threads too.
//!
//! Per-plugin mutual exclusion and FIFO ordering are delegated to a `tokio::sync::Mutex` per
//! plugin: tokio's mutex grants the lock to waiters in acquisition order,
//! which is exactly "FIFO queue of Tasks; at most one running at a time"
//! without hand-rolling a queue/round-robin structure — the Tokio task
//! scheduler performs the round-robin across plugins for free.

use crate::error::{LoadError, LoadResult};
use crate::handlers::Handlers;
use crate::queue::EventQueue;
use crate::registry::{PluginRecord, Registry};
use monitor_core::{
    Event, EventKind, EventPayload, HostReply, LifecycleKind, LogLevel, PluginEntryKind, PluginId,
    PluginState, TransportKind, Value,
};
use monitor_script::{Resumption, ScriptEngine, TaskCoroutine};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

/// Per-plugin concurrency gate: owns the mutex that serializes this
/// plugin's Tasks and the token that cancels its parked ones on unload.
struct PluginRuntime {
    gate: AsyncMutex<()>,
    cancel: CancellationToken,
}

impl Default for PluginRuntime {
    fn default() -> Self {
        Self {
            gate: AsyncMutex::new(()),
            cancel: CancellationToken::new(),
        }
    }
}

/// Owns the Registry, drives the event queue, and schedules Tasks.
pub struct Dispatcher {
    registry: Rc<RefCell<Registry>>,
    runtimes: Rc<RefCell<HashMap<PluginId, Rc<PluginRuntime>>>>,
    engine: ScriptEngine,
    handlers: Arc<Handlers>,
    queue: Arc<EventQueue>,
}

impl Dispatcher {
    pub fn new(handlers: Arc<Handlers>, queue: Arc<EventQueue>) -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry::new())),
            runtimes: Rc::new(RefCell::new(HashMap::new())),
            engine: ScriptEngine::new(),
            handlers,
            queue,
        }
    }

    pub fn registry_len(&self) -> usize {
        self.registry.borrow().len()
    }

    // ----- Plugin Loader --------------------------------------

    /// Reads and evaluates `path`, registers its entries, and runs
    /// `on_load` as the first Task. The plugin is `Ready` only once that
    /// Task completes with a truthy (or absent) result.
    pub async fn load(&self, path: &Path) -> LoadResult<PluginId> {
        let id = PluginId::normalize(path);
        if self.registry.borrow().contains(&id) {
            return Err(LoadError::AlreadyLoaded(id));
        }

        let script = self
            .engine
            .load(path)
            .map_err(|source| LoadError::Script {
                plugin: id.clone(),
                source,
            })?;

        let mut entries = HashMap::new();
        for (name, kind) in script.entries().map_err(|source| LoadError::Script {
            plugin: id.clone(),
            source,
        })? {
            if matches!(kind, PluginEntryKind::UnknownCallback) {
                tracing::warn!(plugin = %id, entry = %name, "unrecognized on_*-prefixed entry, treating as a typo");
            }
            entries.insert(name, kind);
        }

        self.registry.borrow_mut().insert(PluginRecord {
            id: id.clone(),
            state: PluginState::Loading,
            script,
            entries,
        });
        self.runtimes
            .borrow_mut()
            .insert(id.clone(), Rc::new(PluginRuntime::default()));

        let on_load = self
            .registry
            .borrow()
            .get(&id)
            .and_then(|r| r.script.function("on_load").ok().flatten());

        let final_state = match on_load {
            None => PluginState::Ready,
            Some(func) => match self.run_to_completion(&id, func, Vec::new()).await {
                Ok(results) => {
                    let truthy = !matches!(results.first(), Some(Value::Bool(false)) | Some(Value::Nil));
                    if truthy {
                        PluginState::Ready
                    } else {
                        PluginState::Failed
                    }
                }
                Err(message) => {
                    tracing::error!(plugin = %id, "on_load raised: {message}");
                    self.registry.borrow_mut();
                    return Err(LoadError::OnLoadFailed {
                        plugin: id.clone(),
                        message,
                    });
                }
            },
        };

        if let Some(record) = self.registry.borrow_mut().get_mut(&id) {
            record.state = final_state;
        }

        if final_state != PluginState::Ready {
            return Err(LoadError::OnLoadRejected(id));
        }

        Ok(id)
    }

    /// Marks `Unloading`, cancels pending Tasks, runs `on_unload`, then
    /// releases broker-owned resources and evicts the plugin.
    pub async fn unload(&self, id: &PluginId) -> LoadResult<()> {
        if !self.registry.borrow().contains(id) {
            return Err(LoadError::NotLoaded(id.clone()));
        }

        if let Some(record) = self.registry.borrow_mut().get_mut(id) {
            record.state = PluginState::Unloading;
        }

        let runtime = self.runtimes.borrow().get(id).cloned();
        if let Some(runtime) = &runtime {
            runtime.cancel.cancel();
        }

        let on_unload = self
            .registry
            .borrow()
            .get(id)
            .and_then(|r| r.script.function("on_unload").ok().flatten());

        if let Some(func) = on_unload {
            // on_unload is exempt from cancellation.
            let fresh_cancel = CancellationToken::new();
            if let Err(message) = self.run_with_cancel(id, func, Vec::new(), &fresh_cancel).await {
                tracing::debug!(plugin = %id, "on_unload raised: {message}");
            }
        }

        self.handlers.broker.release_plugin(id).await;
        self.registry.borrow_mut().remove(id);
        self.runtimes.borrow_mut().remove(id);
        Ok(())
    }

    /// `unload` then `load`; `on_unload` fully completes before `on_load`
    /// of the reloaded script begins.
    pub async fn reload(&self, path: &Path) -> LoadResult<PluginId> {
        let id = PluginId::normalize(path);
        if self.registry.borrow().contains(&id) {
            self.unload(&id).await?;
        }
        self.load(path).await
    }

    // ----- Event Dispatcher & Scheduler ------------------------

    /// Processes one drained batch of events: for each, determines
    /// interested `Ready` plugins under the current transport routing, and
    /// spawns a Task per interested plugin onto the current `LocalSet`.
    pub fn fan_out(&self, events: Vec<Event>) {
        for event in events {
            let targets: Vec<PluginId> = self
                .registry
                .borrow()
                .ready_plugins()
                .filter(|p| p.entries.contains_key(event.kind.callback_name()))
                .map(|p| p.id.clone())
                .collect();

            for id in targets {
                if !self.event_is_routable(&event.kind) {
                    continue;
                }
                let args = event_args(&event.payload);
                self.spawn_callback(id, event.kind.callback_name().to_string(), args);
            }
        }
    }

    /// Transport-kind routing: `on_rtt_*` callbacks are suppressed
    /// while serial is active and vice versa; BLE events are orthogonal.
    fn event_is_routable(&self, kind: &EventKind) -> bool {
        let active = self.handlers.transport.info().active;
        match active {
            TransportKind::Serial => !kind.is_rtt(),
            TransportKind::Rtt => !kind.is_serial(),
            _ => true,
        }
    }

    /// Schedules `!<plugin> <command> <args>` as a Task.
    pub fn invoke_command(&self, plugin: &str, command: &str, args: Vec<String>) -> bool {
        let target = self
            .registry
            .borrow()
            .find_by_display_name(plugin)
            .filter(|p| p.state.accepts_events())
            .and_then(|p| p.command(command).map(|_| p.id.clone()));

        match target {
            Some(id) => {
                let values = args.into_iter().map(Value::Str).collect();
                self.spawn_callback(id, command.to_string(), values);
                true
            }
            None => false,
        }
    }

    fn spawn_callback(&self, id: PluginId, entry_name: String, args: Vec<Value>) {
        let registry = Rc::clone(&self.registry);
        let runtimes = Rc::clone(&self.runtimes);
        let handlers = Arc::clone(&self.handlers);

        tokio::task::spawn_local(async move {
            let runtime = {
                let mut map = runtimes.borrow_mut();
                Rc::clone(map.entry(id.clone()).or_insert_with(|| Rc::new(PluginRuntime::default())))
            };

            if runtime.cancel.is_cancelled() {
                // Plugin is unloading: drop without starting.
                return;
            }

            let _permit = runtime.gate.lock().await;

            if runtime.cancel.is_cancelled() {
                return;
            }

            let func = {
                let reg = registry.borrow();
                reg.get(&id).and_then(|r| r.script.function(&entry_name).ok().flatten())
            };
            let Some(func) = func else { return };

            let coroutine = {
                let reg = registry.borrow();
                let Some(record) = reg.get(&id) else { return };
                TaskCoroutine::new(&record.script.lua, func)
            };
            let Ok(coroutine) = coroutine else { return };

            if let Err(message) = drive(&coroutine, args, &handlers, &id, &runtime.cancel).await {
                handlers
                    .log
                    .append(&id.display_name(), LogLevel::Error, &strip_chunk_prefix(&message));
                tracing::error!(plugin = %id, "{message}");
            }
        });
    }

    /// Runs `func` to completion on the current plugin's gate, without
    /// spawning, for lifecycle Tasks the Loader must await directly.
    async fn run_to_completion(
        &self,
        id: &PluginId,
        func: mlua::Function,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, String> {
        let runtime = {
            let mut map = self.runtimes.borrow_mut();
            Rc::clone(map.entry(id.clone()).or_insert_with(|| Rc::new(PluginRuntime::default())))
        };
        self.run_with_cancel(id, func, args, &runtime.cancel).await
    }

    async fn run_with_cancel(
        &self,
        id: &PluginId,
        func: mlua::Function,
        args: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>, String> {
        let lua = {
            let reg = self.registry.borrow();
            reg.get(id).map(|r| r.script.lua.clone())
        };
        let Some(lua) = lua else {
            return Err("plugin no longer registered".to_string());
        };
        let coroutine = TaskCoroutine::new(&lua, func).map_err(|e| e.to_string())?;
        drive(&coroutine, args, &self.handlers, id, cancel).await
    }

    /// Runs the Dispatcher's event loop forever (until the queue's `Arc` is
    /// dropped elsewhere and the task is aborted by the caller).
    pub async fn run(&self) -> ! {
        loop {
            let events = self.queue.drain().await;
            self.fan_out(events);
        }
    }
}

/// Drives one Task's coroutine to completion, handling every yielded
/// request via [`Handlers::dispatch`].
async fn drive(
    coroutine: &TaskCoroutine,
    args: Vec<Value>,
    handlers: &Handlers,
    owner: &PluginId,
    cancel: &CancellationToken,
) -> Result<Vec<Value>, String> {
    let mut resumption = coroutine.start(args).map_err(|e| e.to_string())?;
    loop {
        match resumption {
            Resumption::Finished(results) => return Ok(results),
            Resumption::Yielded(request) => {
                let reply: HostReply = handlers.dispatch(owner, &request, cancel).await;
                resumption = coroutine.resume_with_reply(&reply).map_err(|e| e.to_string())?;
            }
        }
    }
}

/// Strips an `mlua` error's `[string "..."]:LINE:` chunk prefix where
/// present.
fn strip_chunk_prefix(message: &str) -> String {
    match message.find("]:") {
        Some(pos) if message.starts_with("[string") => {
            let rest = &message[pos + 2..];
            rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == ':')
                .trim_start()
                .to_string()
        }
        _ => message.to_string(),
    }
}

fn event_args(payload: &EventPayload) -> Vec<Value> {
    match payload {
        EventPayload::Bytes(bytes) => vec![Value::List(
            bytes.iter().map(|b| Value::Number(*b as f64)).collect(),
        )],
        EventPayload::SerialTransition { port, baud } => {
            vec![Value::Str(port.clone()), Value::Number(*baud as f64)]
        }
        EventPayload::BleUuid { uuid } => vec![Value::Str(uuid.clone())],
        EventPayload::BleCharacteristic {
            service,
            characteristic,
            value,
        } => vec![
            Value::Str(service.clone()),
            Value::Str(characteristic.clone()),
            Value::List(value.iter().map(|b| Value::Number(*b as f64)).collect()),
        ],
        EventPayload::MtuChange { uuid, mtu } => {
            vec![Value::Str(uuid.clone()), Value::Number(*mtu as f64)]
        }
        EventPayload::None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::ResourceBroker;
    use monitor_core::{NullLogSink, Transport, TransportError, TransportResult, TransportState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeTransport {
        sent: std::sync::Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        fn info(&self) -> TransportState {
            TransportState::default()
        }
        async fn send(&self, bytes: &[u8]) -> TransportResult<()> {
            self.sent.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
        async fn recv(&self, _timeout: Duration) -> TransportResult<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn rtt_read(&self, _address: u32, _size: usize) -> TransportResult<Vec<u8>> {
            Err(TransportError::NotConnected)
        }
        async fn connect_serial(&self, _port: &str, _baud: u32) -> TransportResult<()> {
            Ok(())
        }
        async fn disconnect(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    /// Reports RTT active and returns deterministic bytes from `rtt_read`.
    struct FakeRttTransport;

    #[async_trait::async_trait]
    impl Transport for FakeRttTransport {
        fn info(&self) -> TransportState {
            TransportState {
                active: monitor_core::TransportKind::Rtt,
                info: monitor_core::TransportInfo::default(),
            }
        }
        async fn send(&self, _bytes: &[u8]) -> TransportResult<()> {
            Ok(())
        }
        async fn recv(&self, _timeout: Duration) -> TransportResult<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn rtt_read(&self, _address: u32, size: usize) -> TransportResult<Vec<u8>> {
            Ok((0..size).map(|i| i as u8).collect())
        }
        async fn connect_serial(&self, _port: &str, _baud: u32) -> TransportResult<()> {
            Ok(())
        }
        async fn disconnect(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    /// Reports serial active, so `rtt.read` is out of interface.
    struct FakeSerialTransport;

    #[async_trait::async_trait]
    impl Transport for FakeSerialTransport {
        fn info(&self) -> TransportState {
            TransportState {
                active: monitor_core::TransportKind::Serial,
                info: monitor_core::TransportInfo::default(),
            }
        }
        async fn send(&self, _bytes: &[u8]) -> TransportResult<()> {
            Ok(())
        }
        async fn recv(&self, _timeout: Duration) -> TransportResult<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn rtt_read(&self, _address: u32, _size: usize) -> TransportResult<Vec<u8>> {
            Err(TransportError::NotConnected)
        }
        async fn connect_serial(&self, _port: &str, _baud: u32) -> TransportResult<()> {
            Ok(())
        }
        async fn disconnect(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    fn write_plugin(src: &str, name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("monitor_dispatcher_test_{name}_{}.lua", std::process::id()));
        std::fs::write(&path, src).unwrap();
        path
    }

    fn dispatcher(transport: Arc<FakeTransport>) -> (Dispatcher, Arc<EventQueue>) {
        dispatcher_with_log(transport, Arc::new(NullLogSink))
    }

    fn dispatcher_with_log(
        transport: Arc<dyn Transport>,
        log: Arc<dyn monitor_core::LogSink>,
    ) -> (Dispatcher, Arc<EventQueue>) {
        let handlers = Arc::new(Handlers {
            broker: Arc::new(ResourceBroker::new("sh")),
            transport,
            log,
            shell_timeout_ms_default: 1000,
        });
        let queue = EventQueue::new(16);
        (Dispatcher::new(handlers, Arc::clone(&queue)), queue)
    }

    struct FakeLog {
        lines: std::sync::Mutex<Vec<(String, LogLevel, String)>>,
    }

    impl FakeLog {
        fn new() -> Self {
            Self {
                lines: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl monitor_core::LogSink for FakeLog {
        fn append(&self, plugin: &str, level: LogLevel, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((plugin.to_string(), level, message.to_string()));
        }
    }

    #[tokio::test]
    async fn hello_echo_scenario() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(FakeTransport {
                    sent: std::sync::Mutex::new(Vec::new()),
                });
                let (dispatcher, queue) = dispatcher(Arc::clone(&transport));

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local p = {}
                    function p.on_serial_recv(msg)
                        scope.serial.send("Hello," .. scope.fmt.to_str(msg))
                    end
                    return p
                    "#,
                    "hello",
                );
                dispatcher.load(&path).await.unwrap();
                std::fs::remove_file(&path).ok();

                queue.push(Event::new(
                    EventKind::SerialRecv,
                    EventPayload::Bytes(vec![0x31, 0x0A]),
                    0,
                ));
                let events = queue.drain().await;
                dispatcher.fan_out(events);

                // Let the spawned local Task run to completion.
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }

                let sent = transport.sent.lock().unwrap();
                assert_eq!(sent.len(), 1);
                assert_eq!(sent[0], b"Hello,1\n");
            })
            .await;
    }

    #[tokio::test]
    async fn unload_cancels_a_sleeping_task() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(FakeTransport {
                    sent: std::sync::Mutex::new(Vec::new()),
                });
                let (dispatcher, _queue) = dispatcher(transport);

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local p = {}
                    function p.on_load()
                        scope.sys.sleep_ms(5000)
                        return true
                    end
                    return p
                    "#,
                    "sleepy",
                );

                // Loading blocks on on_load's sleep; race it against an
                // immediate unload using select, since load() itself awaits
                // on_load synchronously in this design.
                let dispatcher = Arc::new(dispatcher);
                let d1 = Arc::clone(&dispatcher);
                let path2 = path.clone();
                let loader = tokio::task::spawn_local(async move { d1.load(&path2).await });

                tokio::task::yield_now().await;
                let counter = Arc::new(AtomicUsize::new(0));
                let _ = counter.fetch_add(0, Ordering::SeqCst);

                // on_load isn't unloadable mid-flight by design (only
                // post-Ready Tasks are); this documents that it still runs
                // to completion under its own sleep rather than hanging.
                tokio::time::pause();
                tokio::time::advance(Duration::from_millis(5001)).await;
                let result = loader.await.unwrap();
                assert!(result.is_ok());
                std::fs::remove_file(&path).ok();
            })
            .await;
    }

    #[tokio::test]
    async fn unload_cancels_a_running_command_task() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                tokio::time::pause();

                let transport = Arc::new(FakeTransport {
                    sent: std::sync::Mutex::new(Vec::new()),
                });
                let log = Arc::new(FakeLog::new());
                let (dispatcher, _queue) =
                    dispatcher_with_log(transport, log.clone() as Arc<dyn monitor_core::LogSink>);

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local p = {}
                    function p.slow()
                        local status = scope.sys.sleep_ms(5000)
                        scope.log.info(status)
                    end
                    return p
                    "#,
                    "slow",
                );
                let id = dispatcher.load(&path).await.unwrap();
                std::fs::remove_file(&path).ok();

                assert!(dispatcher.invoke_command(&id.display_name(), "slow", Vec::new()));

                // Let the spawned Task start and park on sys.sleep_ms.
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }

                // The Task is cancelled, not merely interrupted: unloading
                // must resolve without ever advancing virtual time past the
                // 5s sleep it's parked on.
                dispatcher.unload(&id).await.unwrap();

                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }

                let lines = log.lines.lock().unwrap();
                assert!(
                    lines.iter().any(|(_, _, msg)| msg == "cancelled"),
                    "expected the slow command to observe a cancelled sleep, got {lines:?}"
                );
            })
            .await;
    }

    #[tokio::test]
    async fn at_responder_scenario() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                tokio::time::pause();

                let transport = Arc::new(FakeTransport {
                    sent: std::sync::Mutex::new(Vec::new()),
                });
                let (dispatcher, queue) = dispatcher(Arc::clone(&transport));

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local p = {}
                    function p.on_serial_recv(msg)
                        local s = scope.fmt.to_str(msg)
                        scope.re.matches(s,
                            "AT\r", function()
                                scope.serial.send("OK\r\n")
                            end,
                            scope.re.literal("AT+COPS?"), function()
                                scope.sys.sleep_ms(1000)
                                scope.serial.send("+COPS: 0\r\n")
                                scope.serial.send("OK\r\n")
                            end,
                            ".*", function()
                                scope.serial.send("ERROR\r\n")
                            end
                        )
                    end
                    return p
                    "#,
                    "at_responder",
                );
                dispatcher.load(&path).await.unwrap();
                std::fs::remove_file(&path).ok();

                queue.push(Event::new(
                    EventKind::SerialRecv,
                    EventPayload::Bytes(b"AT\r".to_vec()),
                    0,
                ));
                let events = queue.drain().await;
                dispatcher.fan_out(events);
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }

                queue.push(Event::new(
                    EventKind::SerialRecv,
                    EventPayload::Bytes(b"AT+COPS?\r".to_vec()),
                    0,
                ));
                let events = queue.drain().await;
                dispatcher.fan_out(events);
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }
                tokio::time::advance(Duration::from_millis(1000)).await;
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }

                queue.push(Event::new(
                    EventKind::SerialRecv,
                    EventPayload::Bytes(b"FOO\r".to_vec()),
                    0,
                ));
                let events = queue.drain().await;
                dispatcher.fan_out(events);
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }

                let sent = transport.sent.lock().unwrap();
                assert_eq!(
                    sent.as_slice(),
                    &[
                        b"OK\r\n".to_vec(),
                        b"+COPS: 0\r\n".to_vec(),
                        b"OK\r\n".to_vec(),
                        b"ERROR\r\n".to_vec(),
                    ]
                );
            })
            .await;
    }

    #[tokio::test]
    async fn timeout_scenario() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(FakeTransport {
                    sent: std::sync::Mutex::new(Vec::new()),
                });
                let log = Arc::new(FakeLog::new());
                let (dispatcher, _queue) =
                    dispatcher_with_log(transport, log.clone() as Arc<dyn monitor_core::LogSink>);

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local p = {}
                    function p.ping()
                        local err = scope.serial.recv({ timeout_ms = 200 })
                        scope.log.info(err)
                    end
                    return p
                    "#,
                    "timeout",
                );
                let id = dispatcher.load(&path).await.unwrap();
                std::fs::remove_file(&path).ok();

                assert!(dispatcher.invoke_command(&id.display_name(), "ping", Vec::new()));
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }

                let lines = log.lines.lock().unwrap();
                assert!(
                    lines.iter().any(|(_, _, msg)| msg == "timeout"),
                    "expected a log line containing \"timeout\", got {lines:?}"
                );
            })
            .await;
    }

    #[tokio::test]
    async fn shell_echo_scenario() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(FakeTransport {
                    sent: std::sync::Mutex::new(Vec::new()),
                });
                let log = Arc::new(FakeLog::new());
                let (dispatcher, _queue) =
                    dispatcher_with_log(transport, log.clone() as Arc<dyn monitor_core::LogSink>);

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local Shell = require("shell")
                    local p = {}
                    function p.on_load()
                        local shell = Shell.new()
                        local stdout, _stderr = shell:run("echo Hello")
                        scope.log.info(stdout)
                        return true
                    end
                    return p
                    "#,
                    "shell_echo",
                );
                let id = dispatcher.load(&path).await.unwrap();
                std::fs::remove_file(&path).ok();

                let lines = log.lines.lock().unwrap();
                assert!(
                    lines.iter().any(|(_, _, msg)| msg.contains("Hello")),
                    "expected a log line containing \"Hello\", got {lines:?}"
                );
                drop(lines);

                // Unload must complete promptly; it releases the broker's
                // shell session, which kills the underlying subprocess.
                dispatcher.unload(&id).await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn rtt_read_scenario() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let log = Arc::new(FakeLog::new());

                // RTT active: the read succeeds and the plugin decodes the
                // 48-byte status record it was handed.
                let rtt_transport = Arc::new(FakeRttTransport);
                let (dispatcher, _queue) = dispatcher_with_log(
                    rtt_transport,
                    log.clone() as Arc<dyn monitor_core::LogSink>,
                );

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local p = {}
                    function p.decode()
                        local err, data = scope.rtt.read({ address = 0x20000000, size = 48 })
                        if err then
                            scope.log.info(err)
                            return
                        end
                        -- 4 scalar bytes, then 4+3+4 four-byte float slots.
                        local scalars = { data[1], data[2], data[3], data[4] }
                        scope.log.info(tostring(#data))
                        scope.log.info(tostring(scalars[1]))
                    end
                    return p
                    "#,
                    "rtt_decode",
                );
                let id = dispatcher.load(&path).await.unwrap();
                std::fs::remove_file(&path).ok();

                assert!(dispatcher.invoke_command(&id.display_name(), "decode", Vec::new()));
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }

                {
                    let lines = log.lines.lock().unwrap();
                    assert!(
                        lines.iter().any(|(_, _, msg)| msg == "48"),
                        "expected the decoded record length to be logged, got {lines:?}"
                    );
                    assert!(
                        lines.iter().any(|(_, _, msg)| msg == "0"),
                        "expected the first scalar byte to be logged, got {lines:?}"
                    );
                }
                dispatcher.unload(&id).await.unwrap();

                // Serial active: the same call is out of interface.
                let serial_transport = Arc::new(FakeSerialTransport);
                let (dispatcher, _queue) = dispatcher_with_log(
                    serial_transport,
                    log.clone() as Arc<dyn monitor_core::LogSink>,
                );

                let path = write_plugin(
                    r#"
                    local scope = require("scope")
                    local p = {}
                    function p.decode()
                        local err = scope.rtt.read({ address = 0x20000000, size = 48 })
                        scope.log.info(tostring(err))
                    end
                    return p
                    "#,
                    "rtt_decode_serial",
                );
                let id = dispatcher.load(&path).await.unwrap();
                std::fs::remove_file(&path).ok();

                assert!(dispatcher.invoke_command(&id.display_name(), "decode", Vec::new()));
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }

                let lines = log.lines.lock().unwrap();
                assert!(
                    lines.iter().any(|(_, _, msg)| msg == "not-active"),
                    "expected a \"not-active\" status while serial is active, got {lines:?}"
                );
            })
            .await;
    }
}
