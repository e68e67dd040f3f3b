//! Chat classification rules ("groupers").
//!
//! A [`GrouperSnapshot`] is an immutable, structurally comparable set of
//! [`Grouper`] rules. Reports compile the snapshot they are given into
//! [`CompiledGrouper`]s; the snapshot itself carries only rule definitions so
//! that two loads of the same files compare equal.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MonitorError, Result};
use crate::models::ChatMessage;

// ── Rule definitions ──────────────────────────────────────────────────────────

/// One classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouper {
    /// Unique rule name, used as the group key in reports.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Regular expressions matched against message text.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Author channel ids whose messages always match.
    #[serde(default)]
    pub channel_ids: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Grouper {
    /// Reject rules that could never be addressed in a report.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::InvalidGrouper {
                name: self.name.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
        if self.patterns.is_empty() && self.channel_ids.is_empty() {
            return Err(MonitorError::InvalidGrouper {
                name: self.name.clone(),
                reason: "needs at least one pattern or channel id".to_string(),
            });
        }
        Ok(())
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Immutable, value-comparable set of grouper rules.
///
/// Cloning is cheap; equality compares rule contents, never identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrouperSnapshot {
    groupers: Arc<[Grouper]>,
}

impl Default for GrouperSnapshot {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl GrouperSnapshot {
    pub fn new(groupers: Vec<Grouper>) -> Self {
        Self {
            groupers: groupers.into(),
        }
    }

    pub fn groupers(&self) -> &[Grouper] {
        &self.groupers
    }

    pub fn len(&self) -> usize {
        self.groupers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groupers.is_empty()
    }

    /// Compile every rule. Invalid patterns are logged and skipped.
    pub fn compile(&self) -> Vec<CompiledGrouper> {
        self.groupers.iter().map(CompiledGrouper::new).collect()
    }
}

/// Source of the current grouper snapshot.
pub trait GrouperSource: Send + Sync {
    /// Load the current rule set.
    fn load(&self) -> Result<GrouperSnapshot>;
}

/// A fixed snapshot, handy when the rules never change.
impl GrouperSource for GrouperSnapshot {
    fn load(&self) -> Result<GrouperSnapshot> {
        Ok(self.clone())
    }
}

// ── Compiled form ─────────────────────────────────────────────────────────────

/// A grouper with its patterns compiled into regexes.
#[derive(Debug, Clone)]
pub struct CompiledGrouper {
    pub name: String,
    pub description: String,
    patterns: Vec<Regex>,
    channel_ids: Vec<String>,
}

impl CompiledGrouper {
    pub fn new(grouper: &Grouper) -> Self {
        let patterns = grouper
            .patterns
            .iter()
            .filter_map(|p| {
                match RegexBuilder::new(p)
                    .case_insensitive(!grouper.case_sensitive)
                    .build()
                {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(grouper = %grouper.name, pattern = %p, error = %e, "skipping invalid grouper pattern");
                        None
                    }
                }
            })
            .collect();

        Self {
            name: grouper.name.clone(),
            description: grouper.description.clone(),
            patterns,
            channel_ids: grouper.channel_ids.clone(),
        }
    }

    /// `true` when the message's author is listed or any pattern matches its text.
    pub fn matches(&self, msg: &ChatMessage) -> bool {
        if !msg.author_channel_id.is_empty()
            && self.channel_ids.iter().any(|c| c == &msg.author_channel_id)
        {
            return true;
        }
        self.patterns.iter().any(|re| re.is_match(&msg.text))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn grouper(name: &str, patterns: &[&str]) -> Grouper {
        Grouper {
            name: name.to_string(),
            description: String::new(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            channel_ids: vec![],
            case_sensitive: false,
        }
    }

    fn msg(text: &str, channel: &str) -> ChatMessage {
        ChatMessage {
            id: String::new(),
            timestamp: 0.0,
            author: "someone".to_string(),
            author_channel_id: channel.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_snapshot_equality_is_structural() {
        let a = GrouperSnapshot::new(vec![grouper("tl", &[r"^\[en\]"])]);
        let b = GrouperSnapshot::new(vec![grouper("tl", &[r"^\[en\]"])]);
        let c = GrouperSnapshot::new(vec![grouper("tl", &[r"^\[jp\]"])]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, GrouperSnapshot::default());
    }

    #[test]
    fn test_pattern_match_is_case_insensitive_by_default() {
        let compiled = CompiledGrouper::new(&grouper("tl", &[r"^\[en\]"]));
        assert!(compiled.matches(&msg("[EN] hello", "")));
        assert!(!compiled.matches(&msg("hello [en]", "")));
    }

    #[test]
    fn test_case_sensitive_pattern() {
        let mut g = grouper("tl", &["EN"]);
        g.case_sensitive = true;
        let compiled = CompiledGrouper::new(&g);
        assert!(compiled.matches(&msg("EN: hi", "")));
        assert!(!compiled.matches(&msg("en: hi", "")));
    }

    #[test]
    fn test_channel_id_match() {
        let mut g = grouper("members", &[]);
        g.channel_ids = vec!["UC123".to_string()];
        let compiled = CompiledGrouper::new(&g);
        assert!(compiled.matches(&msg("anything", "UC123")));
        assert!(!compiled.matches(&msg("anything", "UC999")));
        assert!(!compiled.matches(&msg("anything", "")));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let compiled = CompiledGrouper::new(&grouper("bad", &["(unclosed", "ok"]));
        assert!(compiled.matches(&msg("ok then", "")));
        assert!(!compiled.matches(&msg("(unclosed", "")));
    }

    #[test]
    fn test_validate() {
        assert!(grouper("tl", &["x"]).validate().is_ok());
        assert!(grouper("  ", &["x"]).validate().is_err());
        assert!(grouper("empty", &[]).validate().is_err());
    }

    #[test]
    fn test_snapshot_as_source() {
        let snapshot = GrouperSnapshot::new(vec![grouper("tl", &["x"])]);
        assert_eq!(snapshot.load().unwrap(), snapshot);
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.is_empty());
    }
}
