//! Periodic reconcile driver.
//!
//! Runs [`Supervisor::reconcile`] in a dedicated tokio task: once immediately,
//! then on every tick of a fixed interval. Cycles are awaited one after
//! another, so two never overlap; ticks missed while a slow cycle runs are
//! skipped rather than queued. Reads go through a [`SupervisorHandle`] and
//! never wait on the task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::supervisor::{CycleSummary, Supervisor, SupervisorHandle};

// ── Scheduler ─────────────────────────────────────────────────────────────────

pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler firing every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Move `supervisor` into a background task and start cycling.
    ///
    /// Returns a [`SchedulerHandle`] for reading the views and stopping the
    /// loop, plus a receiver of per-cycle summaries. Summaries are dropped
    /// when the receiver is full or closed; the loop keeps running either way.
    pub fn start(self, supervisor: Supervisor) -> (SchedulerHandle, mpsc::Receiver<CycleSummary>) {
        // Buffer a modest number of summaries so slow consumers don't stall the loop.
        let (tx, rx) = mpsc::channel(16);
        let views = supervisor.handle();

        let task = tokio::spawn(async move {
            self.run(supervisor, tx).await;
        });

        (SchedulerHandle { task, views }, rx)
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn run(self, mut supervisor: Supervisor, tx: mpsc::Sender<CycleSummary>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // The first tick completes immediately.
            interval.tick().await;

            let summary = supervisor.reconcile().await;
            if let Err(e) = tx.try_send(summary) {
                tracing::trace!(error = %e, "cycle summary not delivered");
            }
        }
    }
}

// ── SchedulerHandle ───────────────────────────────────────────────────────────

/// Handle to the background reconcile task.
pub struct SchedulerHandle {
    task: tokio::task::JoinHandle<()>,
    views: SupervisorHandle,
}

impl SchedulerHandle {
    /// Read access to the supervisor's cached views.
    pub fn views(&self) -> &SupervisorHandle {
        &self.views
    }

    /// Immediately abort the reconcile loop.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
