//! Per-broadcast monitors.
//!
//! A [`Monitor`] owns the aggregation task of one live broadcast. The
//! supervisor only starts it, polls its status, asks it to stop and reads its
//! report; the task itself runs detached on the tokio runtime.

use std::path::PathBuf;
use std::time::Duration;

use monitor_core::models::{BroadcastId, BroadcastInfo};
use monitor_core::report::SharedReport;
use monitor_data::chat_log::{chat_log_path, ChatLog};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Handle to the aggregation worker of one broadcast.
pub trait Monitor: Send + Sync {
    fn id(&self) -> &BroadcastId;

    /// Spawn the worker on `runtime`. Returns immediately.
    fn start(&mut self, runtime: &Handle);

    /// Ask the worker to stop. Does not wait for it to finish.
    fn terminate(&self);

    /// `false` once the worker has finished, whether normally or by failure.
    fn is_running(&self) -> bool;

    fn report(&self) -> &SharedReport;
}

/// Builds monitors for newly discovered broadcasts.
pub trait MonitorFactory: Send + Sync {
    fn create(&self, info: BroadcastInfo, report: SharedReport) -> Box<dyn Monitor>;
}

// ── ChatMonitor ───────────────────────────────────────────────────────────────

/// Monitor that tails the broadcast's JSONL chat log into its report.
pub struct ChatMonitor {
    info: BroadcastInfo,
    report: SharedReport,
    log_path: PathBuf,
    poll_interval: Duration,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChatMonitor {
    pub fn new(
        info: BroadcastInfo,
        report: SharedReport,
        log_path: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            info,
            report,
            log_path,
            poll_interval,
            cancel: CancellationToken::new(),
            task: None,
        }
    }
}

impl Monitor for ChatMonitor {
    fn id(&self) -> &BroadcastId {
        &self.info.id
    }

    fn start(&mut self, runtime: &Handle) {
        if self.task.is_some() {
            tracing::warn!(broadcast_id = %self.info.id, "monitor already started");
            return;
        }

        let log = ChatLog::new(self.log_path.clone());
        let report = self.report.clone();
        let cancel = self.cancel.clone();
        let id = self.info.id.clone();
        let poll_interval = self.poll_interval;

        self.task = Some(runtime.spawn(async move {
            run_chat_loop(id, log, report, cancel, poll_interval).await;
        }));
    }

    fn terminate(&self) {
        self.cancel.cancel();
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn report(&self) -> &SharedReport {
        &self.report
    }
}

impl Drop for ChatMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Poll the chat log until cancelled. A read error ends the loop early; the
/// messages gathered so far stay in the report.
async fn run_chat_loop(
    id: BroadcastId,
    mut log: ChatLog,
    report: SharedReport,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    tracing::info!(broadcast_id = %id, path = %log.path().display(), "monitor started");

    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match log.read_new().await {
            Ok(messages) if messages.is_empty() => {}
            Ok(messages) => {
                let mut report = report.write();
                for msg in messages {
                    report.push(msg);
                }
            }
            Err(e) => {
                tracing::warn!(broadcast_id = %id, error = %e, "chat ingestion failed; monitor stopping");
                return;
            }
        }
    }

    tracing::info!(broadcast_id = %id, "monitor terminated");
}

// ── ChatMonitorFactory ────────────────────────────────────────────────────────

/// Creates [`ChatMonitor`]s reading `{chat_dir}/{id}.jsonl`.
#[derive(Debug, Clone)]
pub struct ChatMonitorFactory {
    chat_dir: PathBuf,
    poll_interval: Duration,
}

impl ChatMonitorFactory {
    pub fn new(chat_dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            chat_dir: chat_dir.into(),
            poll_interval,
        }
    }
}

impl MonitorFactory for ChatMonitorFactory {
    fn create(&self, info: BroadcastInfo, report: SharedReport) -> Box<dyn Monitor> {
        let log_path = chat_log_path(&self.chat_dir, &info.id);
        Box::new(ChatMonitor::new(info, report, log_path, self.poll_interval))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
