//! Reconciliation of live broadcasts against running monitors.
//!
//! The [`Supervisor`] exclusively owns the monitor registry, the in-memory
//! archive list and the last applied grouper snapshot. They change only inside
//! [`Supervisor::reconcile`]. After every step that changes them the
//! supervisor publishes fresh lists of report handles to the state shared with
//! [`SupervisorHandle`], so readers always see a whole pre- or post-step view
//! and never block on a cycle in progress.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use monitor_core::discovery::LiveDiscovery;
use monitor_core::groupers::{GrouperSnapshot, GrouperSource};
use monitor_core::models::BroadcastId;
use monitor_core::report::{LiveReport, SharedReport};
use monitor_core::settings::Settings;
use monitor_core::time_utils::now_timestamp;
use monitor_data::archive::ArchiveStore;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::runtime::Handle;

use crate::monitor::{Monitor, MonitorFactory};
use crate::view_cache::TtlCache;

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Archived reports older than this many seconds are dropped from memory.
    pub retention_secs: f64,
    pub live_cache_ttl: Duration,
    pub archive_cache_ttl: Duration,
}

impl SupervisorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            retention_secs: settings.retention_secs(),
            live_cache_ttl: settings.live_cache_ttl(),
            archive_cache_ttl: settings.archive_cache_ttl(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retention_secs: 7.0 * 86_400.0,
            live_cache_ttl: Duration::from_secs(5),
            archive_cache_ttl: Duration::from_secs(30),
        }
    }
}

// ── Cycle summary ─────────────────────────────────────────────────────────────

/// What one reconcile cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSummary {
    pub groupers_changed: bool,
    /// Monitors removed because they were no longer running.
    pub swept: Vec<BroadcastId>,
    /// `false` when the live listing could not be refreshed; start/stop were skipped.
    pub discovery_ok: bool,
    pub started: Vec<BroadcastId>,
    pub stopped: Vec<BroadcastId>,
    /// Reports finalized and appended to the archive list.
    pub archived: usize,
    /// Empty reports dropped without archiving.
    pub discarded: usize,
    /// Per-broadcast failures (metadata fetch, archive write).
    pub failures: usize,
    pub pruned: usize,
}

enum ArchiveOutcome {
    Archived,
    ArchivedNotDurable,
    Discarded,
}

// ── Shared read state ─────────────────────────────────────────────────────────

struct SharedState {
    live: RwLock<Vec<SharedReport>>,
    archives: RwLock<Vec<SharedReport>>,
    live_view: TtlCache<Value>,
    archive_view: TtlCache<Value>,
}

impl SharedState {
    fn render(reports: &[SharedReport]) -> Value {
        let reports: Vec<Value> = reports.iter().map(|r| r.read().to_serializable()).collect();
        json!({ "reports": reports })
    }
}

/// Cloneable, read-only access to a supervisor's views.
#[derive(Clone)]
pub struct SupervisorHandle {
    shared: Arc<SharedState>,
}

impl SupervisorHandle {
    /// `{"reports": [...]}` for every running monitor, cached for the live TTL.
    pub fn live_json(&self) -> Arc<Value> {
        self.shared.live_view.get_or_compute(|| {
            let reports = self.shared.live.read().clone();
            SharedState::render(&reports)
        })
    }

    /// `{"reports": [...]}` for every archived report, cached for the archive TTL.
    pub fn archive_json(&self) -> Arc<Value> {
        self.shared.archive_view.get_or_compute(|| {
            let reports = self.shared.archives.read().clone();
            SharedState::render(&reports)
        })
    }

    pub fn live_count(&self) -> usize {
        self.shared.live.read().len()
    }

    pub fn archive_count(&self) -> usize {
        self.shared.archives.read().len()
    }
}

// ── Supervisor ────────────────────────────────────────────────────────────────

pub struct Supervisor {
    discovery: Box<dyn LiveDiscovery>,
    grouper_source: Box<dyn GrouperSource>,
    factory: Box<dyn MonitorFactory>,
    store: ArchiveStore,
    retention_secs: f64,
    monitors: BTreeMap<BroadcastId, Box<dyn Monitor>>,
    archives: Vec<SharedReport>,
    /// Archive files already written for broadcasts that are still live.
    /// A monitor restarted mid-broadcast archives its report as the next
    /// segment instead of colliding with the earlier file.
    segments: HashMap<BroadcastId, u32>,
    groupers: GrouperSnapshot,
    shared: Arc<SharedState>,
}

impl Supervisor {
    /// Build a supervisor and load the initial grouper snapshot.
    ///
    /// A failed initial load starts with an empty snapshot; the next cycle
    /// retries.
    pub fn new(
        discovery: Box<dyn LiveDiscovery>,
        grouper_source: Box<dyn GrouperSource>,
        factory: Box<dyn MonitorFactory>,
        store: ArchiveStore,
        config: SupervisorConfig,
    ) -> Self {
        let groupers = grouper_source.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "initial grouper load failed; starting without groupers");
            GrouperSnapshot::default()
        });

        let shared = Arc::new(SharedState {
            live: RwLock::new(Vec::new()),
            archives: RwLock::new(Vec::new()),
            live_view: TtlCache::new(config.live_cache_ttl),
            archive_view: TtlCache::new(config.archive_cache_ttl),
        });

        Self {
            discovery,
            grouper_source,
            factory,
            store,
            retention_secs: config.retention_secs,
            monitors: BTreeMap::new(),
            archives: Vec::new(),
            segments: HashMap::new(),
            groupers,
            shared,
        }
    }

    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn live_json(&self) -> Arc<Value> {
        self.handle().live_json()
    }

    pub fn archive_json(&self) -> Arc<Value> {
        self.handle().archive_json()
    }

    /// Ids currently in the registry.
    pub fn tracked_ids(&self) -> BTreeSet<BroadcastId> {
        self.monitors.keys().cloned().collect()
    }

    /// Running status of a tracked monitor, `None` if untracked.
    pub fn monitor_status(&self, id: &BroadcastId) -> Option<bool> {
        self.monitors.get(id).map(|m| m.is_running())
    }

    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }

    pub fn current_groupers(&self) -> &GrouperSnapshot {
        &self.groupers
    }

    /// Run one reconcile cycle. Per-broadcast failures are logged and counted
    /// in the returned summary; nothing here aborts the cycle.
    pub async fn reconcile(&mut self) -> CycleSummary {
        let mut summary = CycleSummary {
            groupers_changed: self.refresh_groupers(),
            ..CycleSummary::default()
        };

        self.sweep_dead(&mut summary).await;

        match self.discovery.refresh().await {
            Ok(()) => {
                summary.discovery_ok = true;

                let live = self.discovery.currently_live();
                let tracked: HashSet<BroadcastId> = self.monitors.keys().cloned().collect();
                let new: Vec<BroadcastId> = live.difference(&tracked).cloned().collect();
                let stopped: Vec<BroadcastId> = tracked.difference(&live).cloned().collect();

                self.start_new(new, &mut summary).await;
                self.stop_finished(stopped, &mut summary).await;
                self.segments.retain(|id, _| live.contains(id));
            }
            Err(e) => {
                tracing::warn!(error = %e, "live discovery refresh failed; skipping start/stop this cycle");
            }
        }

        summary.pruned = self.prune();

        tracing::debug!(
            live = self.monitors.len(),
            archived_total = self.archives.len(),
            started = summary.started.len(),
            stopped = summary.stopped.len(),
            swept = summary.swept.len(),
            archived = summary.archived,
            failures = summary.failures,
            pruned = summary.pruned,
            "reconcile cycle complete"
        );

        summary
    }

    /// Drop archived reports whose broadcast started at or before
    /// `now - retention`. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        self.prune_older_than(now_timestamp() - self.retention_secs)
    }

    fn prune_older_than(&mut self, cutoff: f64) -> usize {
        let before = self.archives.len();
        self.archives
            .retain(|report| report.read().info().start_timestamp > cutoff);
        let pruned = before - self.archives.len();
        if pruned > 0 {
            tracing::info!(pruned, "pruned old archived reports from memory");
            self.publish_archives();
        }
        pruned
    }

    // ── Cycle steps ───────────────────────────────────────────────────────

    /// Load groupers and push them to every running report if they changed.
    fn refresh_groupers(&mut self) -> bool {
        let snapshot = match self.grouper_source.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "grouper reload failed; keeping current groupers");
                return false;
            }
        };

        if snapshot == self.groupers {
            return false;
        }

        for monitor in self.monitors.values() {
            monitor.report().write().set_groupers(snapshot.clone());
        }
        tracing::info!(
            groupers = snapshot.len(),
            monitors = self.monitors.len(),
            "groupers changed; applied to running monitors"
        );
        self.groupers = snapshot;
        true
    }

    /// Remove monitors that are no longer running. Their partial reports are
    /// archived like any finished broadcast.
    async fn sweep_dead(&mut self, summary: &mut CycleSummary) {
        let dead: Vec<BroadcastId> = self
            .monitors
            .iter()
            .filter(|(_, monitor)| !monitor.is_running())
            .map(|(id, _)| id.clone())
            .collect();

        if dead.is_empty() {
            return;
        }

        for id in dead {
            if let Some(monitor) = self.monitors.remove(&id) {
                tracing::info!(broadcast_id = %id, "monitor no longer running; removing");
                let report = monitor.report().clone();
                self.archive(&id, report, summary).await;
                summary.swept.push(id);
            }
        }
        self.publish_live();
    }

    async fn start_new(&mut self, new: Vec<BroadcastId>, summary: &mut CycleSummary) {
        if new.is_empty() {
            return;
        }
        let runtime = Handle::current();

        for id in new {
            let info = match self.discovery.metadata(&id).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(broadcast_id = %id, error = %e, "metadata fetch failed; retrying next cycle");
                    summary.failures += 1;
                    continue;
                }
            };

            let mut report = LiveReport::new(info.clone());
            report.set_groupers(self.groupers.clone());

            let mut monitor = self.factory.create(info, report.into_shared());
            monitor.start(&runtime);

            tracing::info!(broadcast_id = %id, "started monitor");
            self.monitors.insert(id.clone(), monitor);
            summary.started.push(id);
        }
        self.publish_live();
    }

    async fn stop_finished(&mut self, stopped: Vec<BroadcastId>, summary: &mut CycleSummary) {
        if stopped.is_empty() {
            return;
        }

        for id in stopped {
            let Some(monitor) = self.monitors.remove(&id) else {
                continue;
            };
            monitor.terminate();
            tracing::info!(broadcast_id = %id, "broadcast ended; monitor terminated");

            let report = monitor.report().clone();
            self.archive(&id, report, summary).await;
            summary.stopped.push(id);
        }
        self.publish_live();
    }

    /// Finalize a finished report, persist it and append it to the archive
    /// list. Empty reports are dropped. A failed write is logged and the report
    /// is still kept in memory.
    async fn archive(&mut self, id: &BroadcastId, report: SharedReport, summary: &mut CycleSummary) {
        let segment = self.segments.get(id).copied().unwrap_or(0);
        match self.persist(id, &report, segment).await {
            ArchiveOutcome::Discarded => {
                summary.discarded += 1;
                return;
            }
            ArchiveOutcome::ArchivedNotDurable => summary.failures += 1,
            ArchiveOutcome::Archived => {}
        }
        *self.segments.entry(id.clone()).or_insert(0) += 1;

        summary.archived += 1;
        self.archives.push(report);
        self.publish_archives();
    }

    async fn persist(&self, id: &BroadcastId, report: &SharedReport, segment: u32) -> ArchiveOutcome {
        {
            let mut report = report.write();
            if report.is_empty() {
                tracing::debug!(broadcast_id = %id, "empty report; not archiving");
                return ArchiveOutcome::Discarded;
            }
            report.finalize();
        }

        // Frozen from here on.
        let (basename, chat, value) = {
            let report = report.read();
            let basename = self.store.segment_basename(report.info(), segment);
            let chat = self
                .store
                .dump_chat()
                .then(|| report.messages_to_serializable());
            (basename, chat, report.to_serializable())
        };

        let store = self.store.clone();
        let write = tokio::task::spawn_blocking(move || {
            let chat_result = chat.map(|chat| store.write_chat(&basename, &chat));
            let report_result = store.write_report(&basename, &value);
            (chat_result, report_result)
        })
        .await;

        let (chat_result, report_result) = match write {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(broadcast_id = %id, error = %e, "archive write task failed");
                return ArchiveOutcome::ArchivedNotDurable;
            }
        };

        let mut durable = true;
        if let Some(Err(e)) = chat_result {
            tracing::error!(broadcast_id = %id, error = %e, "failed to write chat dump");
            durable = false;
        }
        match report_result {
            Ok(path) => {
                tracing::info!(broadcast_id = %id, path = %path.display(), "report archived");
            }
            Err(e) => {
                tracing::error!(broadcast_id = %id, error = %e, "failed to write report archive");
                durable = false;
            }
        }

        if durable {
            ArchiveOutcome::Archived
        } else {
            ArchiveOutcome::ArchivedNotDurable
        }
    }

    // ── Publishing ────────────────────────────────────────────────────────

    fn publish_live(&self) {
        let reports: Vec<SharedReport> = self.monitors.values().map(|m| m.report().clone()).collect();
        *self.shared.live.write() = reports;
    }

    fn publish_archives(&self) {
        *self.shared.archives.write() = self.archives.clone();
    }
}
