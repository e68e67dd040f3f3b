//! Per-broadcast chat aggregate.
//!
//! A [`LiveReport`] accumulates chat messages for one broadcast and groups
//! them by the grouper snapshot currently assigned to it. It stays mutable
//! while its monitor runs and is frozen by [`LiveReport::finalize`]; every
//! mutation after that point is ignored.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::groupers::{CompiledGrouper, GrouperSnapshot};
use crate::models::{BroadcastInfo, ChatMessage};

/// A report shared between its monitor task and the supervisor.
pub type SharedReport = Arc<RwLock<LiveReport>>;

// ── LiveReport ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LiveReport {
    info: BroadcastInfo,
    messages: Vec<ChatMessage>,
    groupers: GrouperSnapshot,
    compiled: Vec<CompiledGrouper>,
    /// Indices into `messages`, one list per compiled grouper.
    groups: Vec<Vec<usize>>,
    finalized: bool,
    end_timestamp: Option<f64>,
}

impl LiveReport {
    /// Create an empty report bound to `info`, with no groupers assigned.
    pub fn new(info: BroadcastInfo) -> Self {
        Self {
            info,
            messages: Vec::new(),
            groupers: GrouperSnapshot::default(),
            compiled: Vec::new(),
            groups: Vec::new(),
            finalized: false,
            end_timestamp: None,
        }
    }

    /// Wrap the report for sharing between tasks.
    pub fn into_shared(self) -> SharedReport {
        Arc::new(RwLock::new(self))
    }

    pub fn info(&self) -> &BroadcastInfo {
        &self.info
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn groupers(&self) -> &GrouperSnapshot {
        &self.groupers
    }

    /// Number of accumulated messages; zero means nothing worth archiving.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Assign a new grouper snapshot and regroup every accumulated message.
    pub fn set_groupers(&mut self, snapshot: GrouperSnapshot) {
        if self.finalized {
            return;
        }
        self.compiled = snapshot.compile();
        self.groupers = snapshot;
        self.regroup();
    }

    /// Add one message. Returns `false` if the report is already frozen.
    pub fn push(&mut self, msg: ChatMessage) -> bool {
        if self.finalized {
            return false;
        }
        let idx = self.messages.len();
        for (grouper, members) in self.compiled.iter().zip(self.groups.iter_mut()) {
            if grouper.matches(&msg) {
                members.push(idx);
            }
        }
        self.messages.push(msg);
        true
    }

    /// Freeze the report. Calling it again has no effect.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        let last = self
            .messages
            .iter()
            .map(|m| m.timestamp)
            .fold(self.info.start_timestamp, f64::max);
        self.end_timestamp = Some(last);
        self.finalized = true;
    }

    /// Serializable form used by the archive files and the cached views.
    pub fn to_serializable(&self) -> Value {
        let groups: Vec<Value> = self
            .compiled
            .iter()
            .zip(self.groups.iter())
            .map(|(grouper, members)| {
                let messages: Vec<&ChatMessage> =
                    members.iter().map(|&i| &self.messages[i]).collect();
                json!({
                    "name": grouper.name,
                    "description": grouper.description,
                    "messages": messages,
                })
            })
            .collect();

        json!({
            "info": self.info,
            "finalized": self.finalized,
            "end_timestamp": self.end_timestamp,
            "total_messages": self.messages.len(),
            "groups": groups,
        })
    }

    /// Raw message list, as written to the optional chat dump.
    pub fn messages_to_serializable(&self) -> Value {
        json!(self.messages)
    }

    fn regroup(&mut self) {
        self.groups = self
            .compiled
            .iter()
            .map(|grouper| {
                self.messages
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| grouper.matches(m))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupers::Grouper;
    use crate::models::BroadcastId;

    fn info() -> BroadcastInfo {
        BroadcastInfo {
            id: BroadcastId::new("live-1"),
            title: "Karaoke".to_string(),
            channel_id: "UC1".to_string(),
            channel_name: "Singer".to_string(),
            start_timestamp: 1_000.0,
        }
    }

    fn msg(ts: f64, text: &str) -> ChatMessage {
        ChatMessage {
            id: format!("m{ts}"),
            timestamp: ts,
            author: "viewer".to_string(),
            author_channel_id: "UCviewer".to_string(),
            text: text.to_string(),
        }
    }

    fn tl_snapshot(pattern: &str) -> GrouperSnapshot {
        GrouperSnapshot::new(vec![Grouper {
            name: "translations".to_string(),
            description: "Live translations".to_string(),
            patterns: vec![pattern.to_string()],
            channel_ids: vec![],
            case_sensitive: false,
        }])
    }

    fn group_sizes(value: &Value) -> Vec<usize> {
        value["groups"]
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["messages"].as_array().unwrap().len())
            .collect()
    }

    #[test]
    fn test_new_report_is_empty() {
        let report = LiveReport::new(info());
        assert_eq!(report.len(), 0);
        assert!(report.is_empty());
        assert!(!report.is_finalized());
        assert!(report.groupers().is_empty());
    }

    #[test]
    fn test_push_classifies_messages() {
        let mut report = LiveReport::new(info());
        report.set_groupers(tl_snapshot(r"^\[en\]"));
        report.push(msg(1_001.0, "[EN] hello"));
        report.push(msg(1_002.0, "lol"));

        assert_eq!(report.len(), 2);
        let value = report.to_serializable();
        assert_eq!(value["total_messages"], 2);
        assert_eq!(group_sizes(&value), vec![1]);
        assert_eq!(value["groups"][0]["messages"][0]["text"], "[EN] hello");
    }

    #[test]
    fn test_set_groupers_regroups_existing_messages() {
        let mut report = LiveReport::new(info());
        report.set_groupers(tl_snapshot(r"^\[en\]"));
        report.push(msg(1_001.0, "[EN] hello"));
        report.push(msg(1_002.0, "[JP] konnichiwa"));
        assert_eq!(group_sizes(&report.to_serializable()), vec![1]);

        report.set_groupers(tl_snapshot(r"^\[(en|jp)\]"));
        assert_eq!(group_sizes(&report.to_serializable()), vec![2]);
    }

    #[test]
    fn test_finalize_freezes_report() {
        let mut report = LiveReport::new(info());
        report.push(msg(1_005.0, "hi"));
        report.finalize();

        assert!(report.is_finalized());
        assert!(!report.push(msg(1_006.0, "late")));
        report.set_groupers(tl_snapshot("hi"));
        assert_eq!(report.len(), 1);
        assert!(report.groupers().is_empty());
        assert_eq!(report.to_serializable()["end_timestamp"], 1_005.0);
    }

    #[test]
    fn test_serializable_form_is_stable_after_finalize() {
        let mut report = LiveReport::new(info());
        report.set_groupers(tl_snapshot("hi"));
        report.push(msg(1_001.0, "hi there"));
        report.finalize();

        let first = report.to_serializable();
        let second = report.to_serializable();
        assert_eq!(first, second);
    }

    #[test]
    fn test_double_finalize_does_not_corrupt_state() {
        let mut report = LiveReport::new(info());
        report.push(msg(1_003.0, "one"));
        report.finalize();
        let before = report.to_serializable();

        report.finalize();
        let after = report.to_serializable();

        assert_eq!(before, after);
        assert_eq!(after["finalized"], true);
        assert_eq!(after["total_messages"], 1);
    }

    #[test]
    fn test_finalize_empty_report_uses_start_time() {
        let mut report = LiveReport::new(info());
        report.finalize();
        assert_eq!(report.to_serializable()["end_timestamp"], 1_000.0);
    }

    #[test]
    fn test_messages_to_serializable() {
        let mut report = LiveReport::new(info());
        report.push(msg(1_001.0, "a"));
        report.push(msg(1_002.0, "b"));
        let dump = report.messages_to_serializable();
        let arr = dump.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[1]["text"], "b");
    }

    #[test]
    fn test_shared_report_mutation() {
        let shared = LiveReport::new(info()).into_shared();
        shared.write().push(msg(1_001.0, "x"));
        assert_eq!(shared.read().len(), 1);
        assert_eq!(shared.read().info().id.as_str(), "live-1");
    }
}
