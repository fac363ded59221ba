//! The Resource Broker: `Shell` sessions and per-plugin regex
//! pattern caches, both keyed by the owning plugin so unload releases
//! everything.

use monitor_core::{BrokerError, PluginId};
use parking_lot::Mutex as SyncMutex;
use regex::Regex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

/// A long-lived subprocess session.
///
/// Interior-mutable and cloned behind an `Arc` so the broker can hand out a
/// session reference, release its own map lock, and then `.await` the run —
/// a `tokio::sync::Mutex` guard is `Send`, so the lock can stay held across
/// the await instead.
pub struct ShellSession {
    child: AsyncMutex<Child>,
}

/// The sentinel written after every command so `run` knows where output
/// ends, since stdout/stderr otherwise have no message framing.
const SENTINEL: &str = "__monitor_shell_done__";

impl ShellSession {
    async fn spawn(program: &str) -> Result<Self, BrokerError> {
        let child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BrokerError::SpawnFailed(e.to_string()))?;
        Ok(Self {
            child: AsyncMutex::new(child),
        })
    }

    /// Writes `cmd` to stdin followed by a sentinel echoed on both stdout
    /// and stderr, then drains each stream up to its own sentinel. The two
    /// streams are drained concurrently so a command that writes heavily to
    /// one doesn't deadlock behind the other's full pipe buffer. On
    /// timeout, returns `("", "")`.
    pub async fn run(&self, cmd: &str, deadline: Duration) -> Result<(String, String), BrokerError> {
        let result = timeout(deadline, async {
            let mut child = self.child.lock().await;
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| BrokerError::Io("stdin already closed".into()))?;
            stdin
                .write_all(format!("{cmd}\necho {SENTINEL}\necho {SENTINEL} 1>&2\n").as_bytes())
                .await
                .map_err(|e| BrokerError::Io(e.to_string()))?;

            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| BrokerError::Io("stdout already taken".into()))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| BrokerError::Io("stderr already taken".into()))?;

            let (stdout_result, stderr_result) =
                tokio::join!(drain_until_sentinel(stdout), drain_until_sentinel(stderr));
            let (stdout_acc, stdout_stream) = stdout_result?;
            let (stderr_acc, stderr_stream) = stderr_result?;

            child.stdout = Some(stdout_stream);
            child.stderr = Some(stderr_stream);

            Ok::<_, BrokerError>((stdout_acc, stderr_acc))
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_elapsed) => Ok((String::new(), String::new())),
        }
    }

    async fn kill(&self) {
        let _ = self.child.lock().await.start_kill();
    }
}

/// Reads lines from `stream` until the sentinel line, returning the
/// accumulated text and the underlying stream handle so it can be put back
/// for the session's next command.
async fn drain_until_sentinel<R>(stream: R) -> Result<(String, R), BrokerError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut acc = String::new();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BrokerError::Io(e.to_string()))?
    {
        if line.trim() == SENTINEL {
            break;
        }
        acc.push_str(&line);
        acc.push('\n');
    }
    Ok((acc, lines.into_inner().into_inner()))
}

/// Per-plugin state the broker owns: its shell sessions and pattern cache.
#[derive(Default)]
struct PluginResources {
    shells: HashMap<u64, Arc<ShellSession>>,
    patterns: HashMap<String, Regex>,
}

/// Owns every plugin's `Shell` sessions and regex pattern cache.
pub struct ResourceBroker {
    shell_program: String,
    next_shell_id: AtomicU64,
    plugins: SyncMutex<HashMap<PluginId, PluginResources>>,
}

impl ResourceBroker {
    pub fn new(shell_program: impl Into<String>) -> Self {
        Self {
            shell_program: shell_program.into(),
            next_shell_id: AtomicU64::new(1),
            plugins: SyncMutex::new(HashMap::new()),
        }
    }

    /// Spawns a new `Shell` session for `owner` and returns its id.
    pub async fn shell_new(&self, owner: &PluginId) -> Result<u64, BrokerError> {
        let id = self.next_shell_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(ShellSession::spawn(&self.shell_program).await?);
        self.plugins
            .lock()
            .entry(owner.clone())
            .or_default()
            .shells
            .insert(id, session);
        Ok(id)
    }

    /// Runs `cmd` in session `shell_id` owned by `owner`.
    pub async fn shell_run(
        &self,
        owner: &PluginId,
        shell_id: u64,
        cmd: &str,
        timeout_ms: u64,
    ) -> Result<(String, String), BrokerError> {
        let session = {
            let plugins = self.plugins.lock();
            plugins
                .get(owner)
                .and_then(|r| r.shells.get(&shell_id))
                .cloned()
                .ok_or(BrokerError::UnknownShell(shell_id))?
        };
        session.run(cmd, Duration::from_millis(timeout_ms)).await
    }

    /// `shell:exist(prog)` — a platform probe
    pub async fn shell_exist(&self, prog: &str) -> bool {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("where");
            c.arg(prog);
            c
        } else {
            let mut c = Command::new("command");
            c.arg("-v").arg(prog);
            c
        };
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Compiles (or retrieves from cache) the pattern `source` for `owner`.
    pub fn compile(&self, owner: &PluginId, source: &str) -> Result<(), BrokerError> {
        let mut plugins = self.plugins.lock();
        let resources = plugins.entry(owner.clone()).or_default();
        if !resources.patterns.contains_key(source) {
            let regex = Regex::new(source).map_err(|e| BrokerError::Io(e.to_string()))?;
            resources.patterns.insert(source.to_string(), regex);
        }
        Ok(())
    }

    /// `re.match(s, p)`.
    pub fn matches(&self, owner: &PluginId, source: &str, s: &str) -> Result<bool, BrokerError> {
        self.compile(owner, source)?;
        let plugins = self.plugins.lock();
        let resources = plugins.get(owner).expect("just compiled");
        Ok(resources.patterns[source].is_match(s))
    }

    /// `re.matches(s, pairs…)` — first pattern (in order) that matches `s`.
    pub fn first_match<'a>(
        &self,
        owner: &PluginId,
        s: &str,
        patterns: &'a [String],
    ) -> Result<Option<&'a str>, BrokerError> {
        for p in patterns {
            if self.matches(owner, p, s)? {
                return Ok(Some(p.as_str()));
            }
        }
        Ok(None)
    }

    /// `re.literal(s)` — escapes regex metacharacters.
    pub fn literal(source: &str) -> String {
        regex::escape(source)
    }

    /// Releases everything `owner` holds.
    pub async fn release_plugin(&self, owner: &PluginId) {
        let resources = self.plugins.lock().remove(owner);
        if let Some(resources) = resources {
            for (_, session) in resources.shells {
                session.kill().await;
            }
        }
    }
}
