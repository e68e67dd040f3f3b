//! Grouper rule loading from a directory of JSON files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use monitor_core::error::{MonitorError, Result};
use monitor_core::groupers::{Grouper, GrouperSnapshot, GrouperSource};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum GrouperFile {
    Many(Vec<Grouper>),
    One(Grouper),
}

/// Find all `.json` files recursively under `dir`, sorted by path.
pub fn find_grouper_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "json")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Loads every grouper file under a directory on each [`GrouperSource::load`].
#[derive(Debug)]
pub struct DirGrouperSource {
    dir: PathBuf,
    /// Set once an empty directory has been warned about; cleared when files
    /// show up again.
    reported_empty: AtomicBool,
}

impl DirGrouperSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            reported_empty: AtomicBool::new(false),
        }
    }

    fn load_file(path: &Path) -> Result<Vec<Grouper>> {
        let content = std::fs::read_to_string(path).map_err(|source| MonitorError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let groupers = match serde_json::from_str::<GrouperFile>(&content)? {
            GrouperFile::Many(groupers) => groupers,
            GrouperFile::One(grouper) => vec![grouper],
        };
        for grouper in &groupers {
            grouper.validate()?;
        }
        Ok(groupers)
    }
}

impl GrouperSource for DirGrouperSource {
    /// A missing directory yields an empty snapshot. Any unreadable or invalid
    /// file fails the whole load so a half-applied rule set is never used.
    fn load(&self) -> Result<GrouperSnapshot> {
        let files = find_grouper_files(&self.dir);
        if files.is_empty() {
            if !self.reported_empty.swap(true, Ordering::Relaxed) {
                warn!("No grouper files found in {}", self.dir.display());
            }
        } else {
            self.reported_empty.store(false, Ordering::Relaxed);
        }

        let mut groupers = Vec::new();
        for path in &files {
            groupers.extend(Self::load_file(path)?);
        }

        debug!(
            "Loaded {} groupers from {} files",
            groupers.len(),
            files.len()
        );
        Ok(GrouperSnapshot::new(groupers))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
