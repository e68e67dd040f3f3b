//! Incremental reader for per-broadcast JSONL chat logs.
//!
//! Each broadcast's chat is appended by the ingestion side to
//! `{chat_dir}/{id}.jsonl`, one [`ChatMessage`] per line. [`ChatLog`] remembers
//! how far it has read and only returns complete lines written since the
//! previous call.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use monitor_core::error::{MonitorError, Result};
use monitor_core::models::{BroadcastId, ChatMessage};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Path of the chat log for broadcast `id` inside `chat_dir`. The file name
/// uses [`BroadcastId::file_stem`], so it always stays inside `chat_dir`.
pub fn chat_log_path(chat_dir: &Path, id: &BroadcastId) -> PathBuf {
    chat_dir.join(format!("{}.jsonl", id.file_stem()))
}

#[derive(Debug)]
pub struct ChatLog {
    path: PathBuf,
    /// Byte offset just past the last complete line consumed.
    offset: u64,
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read every complete line appended since the last call.
    ///
    /// A missing file yields no messages. Malformed lines are skipped. A file
    /// shorter than the stored offset is treated as truncated and re-read from
    /// the start.
    pub async fn read_new(&mut self) -> Result<Vec<ChatMessage>> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MonitorError::FileRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let read_err = |source: std::io::Error| MonitorError::FileRead {
            path: self.path.clone(),
            source,
        };

        let len = file.metadata().await.map_err(read_err)?.len();
        if len < self.offset {
            debug!(path = %self.path.display(), "chat log truncated; rereading");
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))
            .await
            .map_err(read_err)?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        file.read_to_end(&mut buf).await.map_err(read_err)?;

        // Leave a trailing partial line for the next call.
        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=last_newline];
        self.offset += complete.len() as u64;

        Ok(parse_lines(complete))
    }
}

fn parse_lines(bytes: &[u8]) -> Vec<ChatMessage> {
    let text = String::from_utf8_lossy(bytes);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<ChatMessage>(line) {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!(error = %e, "skipping malformed chat line");
                None
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
