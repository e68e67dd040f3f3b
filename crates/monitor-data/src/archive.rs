//! Durable archive store.
//!
//! Finalized reports (and, optionally, their raw chat) are written as
//! gzip-compressed UTF-8 JSON files named after the broadcast's start time and
//! id. Files are write-once: an existing file is never overwritten.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use monitor_core::error::{MonitorError, Result};
use monitor_core::models::BroadcastInfo;
use monitor_core::time_utils::archive_basename;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Suffix of report archive files.
pub const REPORT_SUFFIX: &str = ".json.gz";

/// Suffix of raw chat dump files.
pub const CHAT_SUFFIX: &str = "_chat.json.gz";

#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
    dump_chat: bool,
    tz: Tz,
}

impl ArchiveStore {
    /// Create a store writing into `dir`, rendering file-name timestamps in `tz`.
    pub fn new(dir: impl Into<PathBuf>, dump_chat: bool, tz: Tz) -> Self {
        Self {
            dir: dir.into(),
            dump_chat,
            tz,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether raw chat dumps should be written alongside reports.
    pub fn dump_chat(&self) -> bool {
        self.dump_chat
    }

    /// Create the archive directory (and parents) if absent.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Base file name shared by every archive file of the broadcast.
    pub fn basename(&self, info: &BroadcastInfo) -> String {
        archive_basename(info.start_timestamp, &info.id, self.tz)
    }

    /// Base name of the `segment`-th archive of one broadcast, counting from 0.
    ///
    /// Segment 0 is the plain [`ArchiveStore::basename`]; later segments come
    /// from a monitor restarted mid-broadcast and get `_2`, `_3`, ... appended.
    pub fn segment_basename(&self, info: &BroadcastInfo, segment: u32) -> String {
        let basename = self.basename(info);
        if segment == 0 {
            basename
        } else {
            format!("{basename}_{}", segment + 1)
        }
    }

    pub fn report_path(&self, basename: &str) -> PathBuf {
        self.dir.join(format!("{basename}{REPORT_SUFFIX}"))
    }

    pub fn chat_path(&self, basename: &str) -> PathBuf {
        self.dir.join(format!("{basename}{CHAT_SUFFIX}"))
    }

    /// Write a finalized report. Returns the path written.
    pub fn write_report<T: Serialize + ?Sized>(&self, basename: &str, report: &T) -> Result<PathBuf> {
        let path = self.report_path(basename);
        write_json_gz(&path, report)?;
        Ok(path)
    }

    /// Write a raw chat dump. Returns the path written.
    pub fn write_chat<T: Serialize + ?Sized>(&self, basename: &str, messages: &T) -> Result<PathBuf> {
        let path = self.chat_path(basename);
        write_json_gz(&path, messages)?;
        Ok(path)
    }
}

// ── gzip JSON helpers ─────────────────────────────────────────────────────────

/// Serialize `value` as gzip-compressed JSON into a new file at `path`.
///
/// Fails if the file already exists. A write that fails after the file was
/// created removes it again, so a later write under the same name can succeed.
pub fn write_json_gz<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let archive_err = |source: std::io::Error| MonitorError::ArchiveWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(archive_err)?;

    if let Err(e) = encode_json_gz(file, value) {
        if let Err(remove_err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove_err, "failed to remove partial archive");
        }
        return Err(archive_err(e));
    }

    debug!(path = %path.display(), "archive written");
    Ok(())
}

fn encode_json_gz<T: Serialize + ?Sized>(file: File, value: &T) -> std::io::Result<()> {
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    let mut writer = encoder.finish()?;
    writer.flush()
}

/// Read a gzip-compressed JSON file back into a [`Value`].
pub fn read_json_gz(path: &Path) -> Result<Value> {
    let file = File::open(path).map_err(|source| MonitorError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_reader(BufReader::new(GzDecoder::new(file)))?;
    Ok(value)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
