//! Host-request handlers: the dispatch table a yielded
//! [`HostRequest`] tag is routed through. Each handler is either
//! *immediate* (returns synchronously) or *deferred* (awaits a future that
//! races against the plugin's cancellation token).

use crate::broker::ResourceBroker;
use monitor_core::{HostReply, HostRequest, LogLevel, LogSink, PluginId, Transport, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a handler needs to act on a request, bundled so
/// [`Handlers::dispatch`] reads as one call site regardless of which shared
/// object the tag actually touches.
pub struct Handlers {
    pub broker: Arc<ResourceBroker>,
    pub transport: Arc<dyn Transport>,
    pub log: Arc<dyn LogSink>,
    pub shell_timeout_ms_default: u64,
}

impl Handlers {
    /// Dispatches one yielded request on behalf of `owner`, racing deferred
    /// calls against `cancel`'s cancellation rule.
    pub async fn dispatch(
        &self,
        owner: &PluginId,
        request: &HostRequest,
        cancel: &CancellationToken,
    ) -> HostReply {
        match request.tag.as_str() {
            "log.debug" => self.log_at(owner, LogLevel::Debug, request),
            "log.info" => self.log_at(owner, LogLevel::Info, request),
            "log.success" => self.log_at(owner, LogLevel::Success, request),
            "log.warning" => self.log_at(owner, LogLevel::Warning, request),
            "log.error" => self.log_at(owner, LogLevel::Error, request),

            "serial.info" => self.serial_info(),
            "rtt.info" => self.rtt_info(),

            "serial.send" | "rtt.send" => self.transport_send(request).await,

            "serial.recv" | "rtt.recv" => {
                self.with_cancellation(cancel, self.transport_recv(request)).await
            }

            "rtt.read" => self.with_cancellation(cancel, self.transport_rtt_read(request)).await,

            "serial.connect" => self.transport_connect(request).await,
            "serial.disconnect" => self.transport_disconnect().await,

            "sys.sleep" => {
                let ms = request.arg(0).and_then(Value::as_number).unwrap_or(0.0) as u64;
                self.with_cancellation(cancel, sleep(ms)).await
            }

            "re.match" => self.re_match(owner, request),
            "re.matches" => self.re_matches(owner, request),
            "re.literal" => self.re_literal(request),

            "Shell.new" => self.with_cancellation(cancel, self.shell_new(owner)).await,
            "Shell:run" => self.with_cancellation(cancel, self.shell_run(owner, request)).await,
            "Shell:exist" => self.with_cancellation(cancel, self.shell_exist(request)).await,

            other => HostReply::status(monitor_core::ReplyStatus::IoError)
                .tap_log(&self.log, owner, &format!("unknown host request tag {other:?}")),
        }
    }

    async fn with_cancellation<F>(&self, cancel: &CancellationToken, fut: F) -> HostReply
    where
        F: std::future::Future<Output = HostReply>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => HostReply::cancelled(),
            reply = fut => reply,
        }
    }

    fn log_at(&self, owner: &PluginId, level: LogLevel, request: &HostRequest) -> HostReply {
        let message = request
            .arg(0)
            .map(Value::coerce_to_string)
            .unwrap_or_default();
        self.log.append(&owner.display_name(), level, &message);
        match level {
            LogLevel::Debug => tracing::debug!(plugin = %owner, "{message}"),
            LogLevel::Info => tracing::info!(plugin = %owner, "{message}"),
            LogLevel::Success => tracing::info!(plugin = %owner, success = true, "{message}"),
            LogLevel::Warning => tracing::warn!(plugin = %owner, "{message}"),
            LogLevel::Error => tracing::error!(plugin = %owner, "{message}"),
        }
        HostReply::empty_ok()
    }

    fn serial_info(&self) -> HostReply {
        let state = self.transport.info();
        HostReply::ok(vec![
            Value::Str(state.info.port),
            Value::Number(state.info.baud as f64),
        ])
    }

    fn rtt_info(&self) -> HostReply {
        let state = self.transport.info();
        HostReply::ok(vec![
            Value::Str(state.info.rtt_target),
            Value::Number(state.info.rtt_channel as f64),
        ])
    }

    async fn transport_send(&self, request: &HostRequest) -> HostReply {
        let bytes = request.arg(0).and_then(Value::list_as_bytes).unwrap_or_default();
        match self.transport.send(&bytes).await {
            Ok(()) => HostReply::empty_ok(),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    async fn transport_recv(&self, request: &HostRequest) -> HostReply {
        let timeout_ms = request.arg(0).and_then(Value::as_number);
        let deadline = Duration::from_millis(timeout_ms.unwrap_or(0.0) as u64);
        match self.transport.recv(deadline).await {
            Ok(Some(bytes)) => HostReply::ok(vec![Value::List(
                bytes.into_iter().map(|b| Value::Number(b as f64)).collect(),
            )]),
            Ok(None) => HostReply::timeout(),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    async fn transport_rtt_read(&self, request: &HostRequest) -> HostReply {
        if self.transport.info().active != monitor_core::TransportKind::Rtt {
            return HostReply::not_active();
        }
        let address = request.arg(0).and_then(Value::as_number).unwrap_or(0.0) as u32;
        let size = request.arg(1).and_then(Value::as_number).unwrap_or(0.0) as usize;
        if size > 1024 {
            return HostReply::invalid_argument();
        }
        match self.transport.rtt_read(address, size).await {
            Ok(bytes) => HostReply::ok(vec![Value::List(
                bytes.into_iter().map(|b| Value::Number(b as f64)).collect(),
            )]),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    async fn transport_connect(&self, request: &HostRequest) -> HostReply {
        let port = request.arg(0).and_then(Value::as_str).unwrap_or_default();
        let baud = request.arg(1).and_then(Value::as_number).unwrap_or(0.0) as u32;
        match self.transport.connect_serial(port, baud).await {
            Ok(()) => HostReply::empty_ok(),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    async fn transport_disconnect(&self) -> HostReply {
        match self.transport.disconnect().await {
            Ok(()) => HostReply::empty_ok(),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    fn re_match(&self, owner: &PluginId, request: &HostRequest) -> HostReply {
        let s = request.arg(0).and_then(Value::as_str).unwrap_or_default();
        let p = request.arg(1).and_then(Value::as_str).unwrap_or_default();
        match self.broker.matches(owner, p, s) {
            Ok(m) => HostReply::ok(vec![Value::Bool(m)]),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    fn re_matches(&self, owner: &PluginId, request: &HostRequest) -> HostReply {
        let s = request.arg(0).and_then(Value::as_str).unwrap_or_default();
        let patterns = request.arg(1).and_then(Value::list_as_strings).unwrap_or_default();
        match self.broker.first_match(owner, s, &patterns) {
            Ok(Some(source)) => HostReply::ok(vec![Value::Str(source.to_string())]),
            Ok(None) => HostReply::empty_ok(),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    fn re_literal(&self, request: &HostRequest) -> HostReply {
        let s = request.arg(0).and_then(Value::as_str).unwrap_or_default();
        HostReply::ok(vec![Value::Str(ResourceBroker::literal(s))])
    }

    async fn shell_new(&self, owner: &PluginId) -> HostReply {
        match self.broker.shell_new(owner).await {
            Ok(id) => HostReply::ok(vec![Value::Number(id as f64)]),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    async fn shell_run(&self, owner: &PluginId, request: &HostRequest) -> HostReply {
        let shell_id = request.arg(0).and_then(Value::as_number).unwrap_or(0.0) as u64;
        let cmd = request.arg(1).and_then(Value::as_str).unwrap_or_default();
        let timeout_ms = request
            .arg(2)
            .and_then(Value::as_number)
            .unwrap_or(self.shell_timeout_ms_default as f64) as u64;
        match self.broker.shell_run(owner, shell_id, cmd, timeout_ms).await {
            Ok((stdout, stderr)) => HostReply::ok(vec![Value::Str(stdout), Value::Str(stderr)]),
            Err(_) => HostReply::status(monitor_core::ReplyStatus::IoError),
        }
    }

    async fn shell_exist(&self, request: &HostRequest) -> HostReply {
        let prog = request.arg(1).and_then(Value::as_str).unwrap_or_default();
        HostReply::ok(vec![Value::Bool(self.broker.shell_exist(prog).await)])
    }
}

async fn sleep(ms: u64) -> HostReply {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    HostReply::empty_ok()
}

trait TapLog {
    fn tap_log(self, log: &Arc<dyn LogSink>, owner: &PluginId, message: &str) -> HostReply;
}

impl TapLog for HostReply {
    fn tap_log(self, log: &Arc<dyn LogSink>, owner: &PluginId, message: &str) -> HostReply {
        log.append(&owner.display_name(), LogLevel::Warning, message);
        self
    }
}
