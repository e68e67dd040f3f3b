//! Hand-written fakes for the supervisor's seams.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use monitor_core::discovery::LiveDiscovery;
use monitor_core::error::{MonitorError, Result};
use monitor_core::groupers::{Grouper, GrouperSnapshot, GrouperSource};
use monitor_core::models::{BroadcastId, BroadcastInfo, ChatMessage};
use monitor_core::report::SharedReport;
use monitor_data::archive::ArchiveStore;
use monitor_runtime::monitor::{Monitor, MonitorFactory};
use monitor_runtime::supervisor::{Supervisor, SupervisorConfig};
use parking_lot::Mutex;
use tokio::runtime::Handle;

// ── builders ──────────────────────────────────────────────────────────────────

pub fn info(id: &str, start: f64) -> BroadcastInfo {
    BroadcastInfo {
        id: BroadcastId::new(id),
        title: format!("{id} title"),
        channel_id: format!("UC-{id}"),
        channel_name: format!("{id} channel"),
        start_timestamp: start,
    }
}

pub fn msg(ts: f64, text: &str) -> ChatMessage {
    ChatMessage {
        id: format!("{ts}"),
        timestamp: ts,
        author: "viewer".to_string(),
        author_channel_id: "UC-viewer".to_string(),
        text: text.to_string(),
    }
}

pub fn snapshot(pattern: &str) -> GrouperSnapshot {
    GrouperSnapshot::new(vec![Grouper {
        name: "translations".to_string(),
        description: String::new(),
        patterns: vec![pattern.to_string()],
        channel_ids: vec![],
        case_sensitive: false,
    }])
}

pub fn id(s: &str) -> BroadcastId {
    BroadcastId::new(s)
}

// ── discovery ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct DiscoveryState {
    pub live: BTreeMap<BroadcastId, BroadcastInfo>,
    pub fail_refresh: bool,
    pub missing_metadata: HashSet<BroadcastId>,
}

#[derive(Clone, Default)]
pub struct DiscoveryControl(Arc<Mutex<DiscoveryState>>);

impl DiscoveryControl {
    pub fn set_live(&self, lives: &[BroadcastInfo]) {
        self.0.lock().live = lives.iter().map(|i| (i.id.clone(), i.clone())).collect();
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.0.lock().fail_refresh = fail;
    }

    pub fn hide_metadata(&self, id: &BroadcastId, hidden: bool) {
        let mut state = self.0.lock();
        if hidden {
            state.missing_metadata.insert(id.clone());
        } else {
            state.missing_metadata.remove(id);
        }
    }
}

pub struct FakeDiscovery {
    control: DiscoveryControl,
    live: HashSet<BroadcastId>,
}

impl FakeDiscovery {
    pub fn new(control: DiscoveryControl) -> Self {
        Self {
            control,
            live: HashSet::new(),
        }
    }
}

#[async_trait]
impl LiveDiscovery for FakeDiscovery {
    async fn refresh(&mut self) -> Result<()> {
        let state = self.control.0.lock();
        if state.fail_refresh {
            return Err(MonitorError::Discovery("listing unavailable".to_string()));
        }
        self.live = state.live.keys().cloned().collect();
        Ok(())
    }

    fn currently_live(&self) -> HashSet<BroadcastId> {
        self.live.clone()
    }

    async fn metadata(&self, id: &BroadcastId) -> Result<BroadcastInfo> {
        let state = self.control.0.lock();
        if state.missing_metadata.contains(id) {
            return Err(MonitorError::BroadcastNotFound(id.to_string()));
        }
        state
            .live
            .get(id)
            .cloned()
            .ok_or_else(|| MonitorError::BroadcastNotFound(id.to_string()))
    }
}

// ── groupers ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct GrouperControl {
    current: Arc<Mutex<Option<GrouperSnapshot>>>,
}

impl GrouperControl {
    pub fn set(&self, snapshot: GrouperSnapshot) {
        *self.current.lock() = Some(snapshot);
    }

    /// Make the next loads fail.
    pub fn break_source(&self) {
        *self.current.lock() = None;
    }
}

pub struct FakeGroupers(pub GrouperControl);

impl GrouperSource for FakeGroupers {
    fn load(&self) -> Result<GrouperSnapshot> {
        self.0
            .current
            .lock()
            .clone()
            .ok_or_else(|| MonitorError::Config("grouper files unreadable".to_string()))
    }
}

// ── monitors ──────────────────────────────────────────────────────────────────

pub struct MonitorState {
    pub id: BroadcastId,
    pub report: SharedReport,
    /// Grouper snapshot the report carried when the monitor was created.
    pub groupers_at_creation: GrouperSnapshot,
    pub running: AtomicBool,
    pub starts: AtomicUsize,
    pub terminated: AtomicBool,
}

impl MonitorState {
    pub fn push(&self, m: ChatMessage) {
        self.report.write().push(m);
    }

    /// Simulate the aggregation task ending on its own.
    pub fn die(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

struct FakeMonitor(Arc<MonitorState>);

impl Monitor for FakeMonitor {
    fn id(&self) -> &BroadcastId {
        &self.0.id
    }

    fn start(&mut self, _runtime: &Handle) {
        self.0.starts.fetch_add(1, Ordering::SeqCst);
        self.0.running.store(true, Ordering::SeqCst);
    }

    fn terminate(&self) {
        self.0.terminated.store(true, Ordering::SeqCst);
        self.0.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.0.running.load(Ordering::SeqCst)
    }

    fn report(&self) -> &SharedReport {
        &self.0.report
    }
}

#[derive(Clone, Default)]
pub struct MonitorLog(Arc<Mutex<Vec<Arc<MonitorState>>>>);

impl MonitorLog {
    /// Every monitor ever created for `id`, oldest first.
    pub fn created_for(&self, id: &BroadcastId) -> Vec<Arc<MonitorState>> {
        self.0
            .lock()
            .iter()
            .filter(|m| &m.id == id)
            .cloned()
            .collect()
    }

    /// The most recently created monitor for `id`.
    pub fn latest(&self, id: &BroadcastId) -> Arc<MonitorState> {
        self.created_for(id)
            .pop()
            .unwrap_or_else(|| panic!("no monitor created for {id}"))
    }

    pub fn total(&self) -> usize {
        self.0.lock().len()
    }
}

pub struct FakeFactory(pub MonitorLog);

impl MonitorFactory for FakeFactory {
    fn create(&self, info: BroadcastInfo, report: SharedReport) -> Box<dyn Monitor> {
        let groupers_at_creation = report.read().groupers().clone();
        let state = Arc::new(MonitorState {
            id: info.id,
            report,
            groupers_at_creation,
            running: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        });
        self.0.0.lock().push(state.clone());
        Box::new(FakeMonitor(state))
    }
}

// ── harness ───────────────────────────────────────────────────────────────────

pub struct Harness {
    pub supervisor: Supervisor,
    pub discovery: DiscoveryControl,
    pub groupers: GrouperControl,
    pub monitors: MonitorLog,
}

pub fn harness(store: ArchiveStore, config: SupervisorConfig) -> Harness {
    let discovery = DiscoveryControl::default();
    let groupers = GrouperControl::default();
    groupers.set(GrouperSnapshot::default());
    let monitors = MonitorLog::default();

    let supervisor = Supervisor::new(
        Box::new(FakeDiscovery::new(discovery.clone())),
        Box::new(FakeGroupers(groupers.clone())),
        Box::new(FakeFactory(monitors.clone())),
        store,
        config,
    );

    Harness {
        supervisor,
        discovery,
        groupers,
        monitors,
    }
}

pub fn store(dir: &std::path::Path, dump_chat: bool) -> ArchiveStore {
    ArchiveStore::new(dir, dump_chat, Tz::UTC)
}

/// Config with a retention long enough that nothing recent is pruned.
pub fn config() -> SupervisorConfig {
    SupervisorConfig::default()
}
