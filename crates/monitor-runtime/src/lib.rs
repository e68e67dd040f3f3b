//! Runtime layer for the broadcast monitor.
//!
//! Holds the per-broadcast monitors, the supervisor that reconciles them
//! against live discovery and archives finished reports, the TTL-cached read
//! views and the scheduler that drives reconcile cycles.

pub mod monitor;
pub mod scheduler;
pub mod supervisor;
pub mod view_cache;

pub use monitor_core as core;
pub use monitor_data as data;
