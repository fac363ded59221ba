//! Default [`CommandSource`] implementation: reads `!plugin command args`
//! lines from stdin, standing in for the TUI's bottom input bar when
//! none is attached.

use async_trait::async_trait;
use monitor_core::CommandSource;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex as AsyncMutex;

/// Reads one line at a time from the process's standard input.
pub struct StdinCommandSource {
    reader: AsyncMutex<BufReader<Stdin>>,
}

impl StdinCommandSource {
    pub fn new() -> Self {
        Self {
            reader: AsyncMutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for StdinCommandSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSource for StdinCommandSource {
    async fn next_line(&self) -> Option<String> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\n', '\r']);
                Some(trimmed.to_string())
            }
            Err(_) => None,
        }
    }
}
