//! Filesystem layer for the broadcast monitor.
//!
//! Writes compressed archive files, tails per-broadcast JSONL chat logs,
//! reads the live-broadcast listing and loads grouper rule files.

pub mod archive;
pub mod chat_log;
pub mod discovery;
pub mod groupers;

pub use monitor_core as core;
