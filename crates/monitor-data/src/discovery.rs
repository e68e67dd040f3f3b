//! File-backed live discovery.
//!
//! Reads a JSON document describing the currently live broadcasts, either
//! `{"lives": [BroadcastInfo, ...]}` or a bare array of the same objects.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use monitor_core::discovery::LiveDiscovery;
use monitor_core::error::{MonitorError, Result};
use monitor_core::models::{BroadcastId, BroadcastInfo};
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum LiveListing {
    Wrapped { lives: Vec<BroadcastInfo> },
    Bare(Vec<BroadcastInfo>),
}

impl LiveListing {
    fn into_lives(self) -> Vec<BroadcastInfo> {
        match self {
            LiveListing::Wrapped { lives } => lives,
            LiveListing::Bare(lives) => lives,
        }
    }
}

#[derive(Debug)]
pub struct FileDiscovery {
    path: PathBuf,
    lives: HashMap<BroadcastId, BroadcastInfo>,
}

impl FileDiscovery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lives: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LiveDiscovery for FileDiscovery {
    async fn refresh(&mut self) -> Result<()> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| MonitorError::Discovery(format!("{}: {}", self.path.display(), e)))?;
        let listing: LiveListing = serde_json::from_str(&content)?;

        self.lives = listing
            .into_lives()
            .into_iter()
            .map(|info| (info.id.clone(), info))
            .collect();

        debug!(live = self.lives.len(), "live listing refreshed");
        Ok(())
    }

    fn currently_live(&self) -> HashSet<BroadcastId> {
        self.lives.keys().cloned().collect()
    }

    async fn metadata(&self, id: &BroadcastId) -> Result<BroadcastInfo> {
        self.lives
            .get(id)
            .cloned()
            .ok_or_else(|| MonitorError::BroadcastNotFound(id.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
