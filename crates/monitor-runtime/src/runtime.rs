//! Main runtime orchestration for the Monitor plugin runtime.
//!
//! `mlua`'s types (and the `Rc<RefCell<_>>` bookkeeping built on top of
//! them in [`monitor_framework::Dispatcher`]) are not `Send`, so the
//! Dispatcher is confined to one dedicated OS thread — "the script thread"
//! — running its own single-threaded Tokio runtime inside a
//! `tokio::task::LocalSet`. Everything else ([`MonitorRuntime`] itself, the
//! command-source reader, signal handling) runs on the caller's ordinary
//! (possibly multi-threaded) Tokio runtime and reaches the script thread
//! only through an [`mpsc`] channel of [`ScriptCommand`]s, each carrying
//! its own `oneshot` reply — the same state-machine-driven-by-a-per-Task-
//! reply-channel technique used for individual coroutine Tasks, applied one
//! level up at the thread boundary.

use crate::config::MonitorConfig;
use monitor_core::{CommandSource, LogSink, PluginId, Transport};
use monitor_framework::{Dispatcher, EventQueue, Handlers, LoadError, LoadResult, ResourceBroker, parse_invocation};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A request sent to the script thread. Each variant carries the reply
/// channel for its result, since the caller lives on a different thread.
enum ScriptCommand {
    Load(PathBuf, oneshot::Sender<LoadResult<PluginId>>),
    Unload(PluginId, oneshot::Sender<LoadResult<()>>),
    Reload(PathBuf, oneshot::Sender<LoadResult<PluginId>>),
    Invoke {
        plugin: String,
        command: String,
        args: Vec<String>,
        reply: oneshot::Sender<bool>,
    },
    RegistryLen(oneshot::Sender<usize>),
    Shutdown,
}

/// Handle to the running script thread: the channel to reach the
/// Dispatcher, and the `JoinHandle` to wait for it to exit on [`shutdown`].
///
/// [`shutdown`]: ScriptThread::shutdown
struct ScriptThread {
    tx: mpsc::UnboundedSender<ScriptCommand>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl ScriptThread {
    fn spawn(handlers: Arc<Handlers>, queue: Arc<EventQueue>) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let join = std::thread::Builder::new()
            .name("monitor-script".to_string())
            .spawn(move || script_thread_main(handlers, queue, rx))
            .map_err(|e| crate::error::RuntimeError::ScriptThreadStartup(e.to_string()))?;

        Ok(Self {
            tx,
            join: Some(join),
        })
    }

    async fn shutdown(mut self) {
        let _ = self.tx.send(ScriptCommand::Shutdown);
        if let Some(join) = self.join.take() {
            // blocking::spawn_blocking keeps the async shutdown path from
            // stalling the caller's executor while the script thread winds
            // down its Tasks.
            let _ = tokio::task::spawn_blocking(move || join.join()).await;
        }
    }
}

/// Entry point for the dedicated script thread: builds a current-thread
/// Tokio runtime, constructs the Dispatcher inside a `LocalSet`, and
/// services [`ScriptCommand`]s until told to shut down.
fn script_thread_main(
    handlers: Arc<Handlers>,
    queue: Arc<EventQueue>,
    mut rx: mpsc::UnboundedReceiver<ScriptCommand>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "script thread failed to build its Tokio runtime");
            return;
        }
    };

    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, async move {
        let dispatcher = Rc::new(Dispatcher::new(handlers, queue));

        let event_loop = {
            let dispatcher = Rc::clone(&dispatcher);
            tokio::task::spawn_local(async move {
                dispatcher.run().await;
            })
        };

        while let Some(cmd) = rx.recv().await {
            match cmd {
                ScriptCommand::Load(path, reply) => {
                    let result = dispatcher.load(&path).await;
                    let _ = reply.send(result);
                }
                ScriptCommand::Unload(id, reply) => {
                    let result = dispatcher.unload(&id).await;
                    let _ = reply.send(result);
                }
                ScriptCommand::Reload(path, reply) => {
                    let result = dispatcher.reload(&path).await;
                    let _ = reply.send(result);
                }
                ScriptCommand::Invoke {
                    plugin,
                    command,
                    args,
                    reply,
                } => {
                    let matched = dispatcher.invoke_command(&plugin, &command, args);
                    let _ = reply.send(matched);
                }
                ScriptCommand::RegistryLen(reply) => {
                    let _ = reply.send(dispatcher.registry_len());
                }
                ScriptCommand::Shutdown => break,
            }
        }

        event_loop.abort();
    });
}

/// Orchestrates the Monitor plugin runtime: owns the event queue, the
/// script thread, and the background task that turns submitted command
/// lines into `invoke_command` calls.
pub struct MonitorRuntime {
    config: MonitorConfig,
    queue: Arc<EventQueue>,
    transport: Arc<dyn Transport>,
    log: Arc<dyn LogSink>,
    command_source: Arc<dyn CommandSource>,
    script: Mutex<Option<ScriptThread>>,
    command_loop: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MonitorRuntime {
    /// Creates a new runtime. Nothing is spawned until [`init`](Self::init).
    pub fn new(
        config: MonitorConfig,
        transport: Arc<dyn Transport>,
        log: Arc<dyn LogSink>,
        command_source: Arc<dyn CommandSource>,
    ) -> Self {
        let queue = EventQueue::new(config.event_queue_depth);
        Self {
            config,
            queue,
            transport,
            log,
            command_source,
            script: Mutex::new(None),
            command_loop: Mutex::new(None),
        }
    }

    /// The bounded event queue external producers (a transport driver's
    /// reader thread, a timer wheel) post [`monitor_core::Event`]s onto.
    pub fn event_queue(&self) -> Arc<EventQueue> {
        Arc::clone(&self.queue)
    }

    /// Starts the script thread and performs the startup plugin directory
    /// scan.
    pub async fn init(&self) -> anyhow::Result<()> {
        {
            let guard = self.script.lock().await;
            if guard.is_some() {
                warn!("runtime already initialized");
                return Ok(());
            }
        }

        let handlers = Arc::new(Handlers {
            broker: Arc::new(ResourceBroker::new(self.config.shell.program.clone())),
            transport: Arc::clone(&self.transport),
            log: Arc::clone(&self.log),
            shell_timeout_ms_default: self.config.shell.timeout_ms_default,
        });

        let script = ScriptThread::spawn(handlers, Arc::clone(&self.queue))?;
        *self.script.lock().await = Some(script);

        self.scan_plugin_dirs().await;

        info!("runtime initialized");
        Ok(())
    }

    async fn scan_plugin_dirs(&self) {
        for dir in self.config.plugin_dirs.clone() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to scan plugin directory");
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("lua") {
                    continue;
                }
                match self.load_plugin(&path).await {
                    Ok(id) => info!(plugin = %id.display_name(), "plugin loaded"),
                    Err(e) => error!(path = %path.display(), error = %e, "failed to load plugin"),
                }
            }
        }
    }

    /// Loads a single plugin file, as `!reload` / a directory scan would.
    pub async fn load_plugin(&self, path: &Path) -> anyhow::Result<PluginId> {
        let (tx, rx) = oneshot::channel();
        self.send_script_command(ScriptCommand::Load(path.to_path_buf(), tx))
            .await?;
        Ok(rx
            .await
            .map_err(|_| anyhow::anyhow!("script thread dropped the reply channel"))??)
    }

    /// Unloads a plugin by id.
    pub async fn unload_plugin(&self, id: PluginId) -> anyhow::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send_script_command(ScriptCommand::Unload(id, tx))
            .await?;
        Ok(rx
            .await
            .map_err(|_| anyhow::anyhow!("script thread dropped the reply channel"))??)
    }

    /// Unloads and reloads a plugin from the same path.
    pub async fn reload_plugin(&self, path: &Path) -> anyhow::Result<PluginId> {
        let (tx, rx) = oneshot::channel();
        self.send_script_command(ScriptCommand::Reload(path.to_path_buf(), tx))
            .await?;
        Ok(rx
            .await
            .map_err(|_| anyhow::anyhow!("script thread dropped the reply channel"))??)
    }

    /// Number of currently loaded plugins.
    pub async fn plugin_count(&self) -> anyhow::Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.send_script_command(ScriptCommand::RegistryLen(tx))
            .await?;
        rx.await
            .map_err(|_| anyhow::anyhow!("script thread dropped the reply channel"))
    }

    async fn send_script_command(&self, cmd: ScriptCommand) -> anyhow::Result<()> {
        let guard = self.script.lock().await;
        let script = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("runtime is not initialized"))?;
        script
            .tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("script thread is no longer reachable"))
    }

    /// Parses and routes one `!plugin command [arg...]` line. Returns
    /// `Ok(true)` if a command handler matched, `Ok(false)` if the line was
    /// malformed or no matching plugin/command/handler exists.
    pub async fn submit_command_line(&self, line: &str) -> anyhow::Result<bool> {
        let Some(invocation) = parse_invocation(line) else {
            debug!(line, "malformed command line, ignoring");
            return Ok(false);
        };

        let (tx, rx) = oneshot::channel();
        self.send_script_command(ScriptCommand::Invoke {
            plugin: invocation.plugin,
            command: invocation.command,
            args: invocation.args,
            reply: tx,
        })
        .await?;

        rx.await
            .map_err(|_| anyhow::anyhow!("script thread dropped the reply channel"))
    }

    /// Starts the background task that drains the command source and
    /// routes submitted lines into the Dispatcher.
    ///
    /// Takes `self: &Arc<Self>`, matching this workspace's convention for
    /// methods that spawn a task needing to outlive the calling frame,
    /// rather than reaching for a raw pointer to fake a `'static` borrow.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        {
            let guard = self.command_loop.lock().await;
            if guard.is_some() {
                warn!("command loop already running");
                return Ok(());
            }
        }

        let command_source = Arc::clone(&self.command_source);
        let runtime = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(line) = command_source.next_line().await {
                if let Err(e) = runtime.submit_command_line(&line).await {
                    error!(error = %e, "failed to route command line");
                }
            }
        });

        *self.command_loop.lock().await = Some(handle);
        info!("runtime started");
        Ok(())
    }

    /// Stops the command loop and the script thread.
    pub async fn stop(&self) -> anyhow::Result<()> {
        if let Some(handle) = self.command_loop.lock().await.take() {
            handle.abort();
        }

        if let Some(script) = self.script.lock().await.take() {
            script.shutdown().await;
        }

        info!("runtime stopped");
        Ok(())
    }

    /// Runs until a shutdown signal (Ctrl+C, or SIGTERM on Unix) arrives.
    pub async fn run(self: &Arc<Self>) -> anyhow::Result<()> {
        self.init().await?;
        self.start().await?;

        info!("Monitor runtime is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;

        self.stop().await
    }

    /// Runs until `shutdown` resolves, for embedding in a TUI event loop
    /// that has its own exit condition.
    pub async fn run_until<F>(self: &Arc<Self>, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.init().await?;
        self.start().await?;

        shutdown.await;

        self.stop().await
    }
}

/// Waits for Ctrl+C, or SIGTERM on Unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler, watching Ctrl+C only");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("received Ctrl+C, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::{NullCommandSource, NullLogSink, NullTransport};

    fn test_runtime() -> MonitorRuntime {
        MonitorRuntime::new(
            MonitorConfig::default(),
            Arc::new(NullTransport),
            Arc::new(NullLogSink),
            Arc::new(NullCommandSource),
        )
    }

    #[tokio::test]
    async fn init_starts_the_script_thread_and_is_idempotent() {
        let runtime = test_runtime();
        runtime.init().await.unwrap();
        runtime.init().await.unwrap();
        assert_eq!(runtime.plugin_count().await.unwrap(), 0);
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn loading_a_missing_plugin_reports_an_error_without_panicking() {
        let runtime = test_runtime();
        runtime.init().await.unwrap();
        let result = runtime.load_plugin(Path::new("/no/such/plugin.lua")).await;
        assert!(result.is_err());
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_command_lines_are_ignored() {
        let runtime = test_runtime();
        runtime.init().await.unwrap();
        let matched = runtime.submit_command_line("not a bang command").await.unwrap();
        assert!(!matched);
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn commands_before_init_are_rejected() {
        let runtime = test_runtime();
        let result = runtime.submit_command_line("!demo ping").await;
        assert!(result.is_err());
    }
}
