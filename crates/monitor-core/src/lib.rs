//! Core types for the broadcast monitor.
//!
//! Holds the data model shared by every other crate: broadcast metadata and
//! chat messages, the grouper rule snapshot, the per-broadcast [`report::LiveReport`]
//! aggregate, the live-discovery seam, CLI settings and the error type.

pub mod discovery;
pub mod error;
pub mod groupers;
pub mod models;
pub mod report;
pub mod settings;
pub mod time_utils;

pub use error::{MonitorError, Result};
