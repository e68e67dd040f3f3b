mod bootstrap;

use anyhow::Result;
use monitor_core::settings::Settings;
use monitor_core::time_utils::parse_timezone;
use monitor_data::archive::ArchiveStore;
use monitor_data::discovery::FileDiscovery;
use monitor_data::groupers::DirGrouperSource;
use monitor_runtime::monitor::ChatMonitorFactory;
use monitor_runtime::scheduler::Scheduler;
use monitor_runtime::supervisor::{Supervisor, SupervisorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories(&settings.archives_dir, &settings.chat_dir)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Broadcast Monitor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Interval: {}s, History: {} days, Archives: {}, Dump chat: {}, Timezone: {}",
        settings.interval,
        settings.history_days,
        settings.archives_dir.display(),
        settings.dump_chat,
        settings.timezone
    );

    let store = ArchiveStore::new(
        &settings.archives_dir,
        settings.dump_chat,
        parse_timezone(&settings.timezone),
    );

    let mut supervisor = Supervisor::new(
        Box::new(FileDiscovery::new(&settings.live_file)),
        Box::new(DirGrouperSource::new(&settings.groupers_dir)),
        Box::new(ChatMonitorFactory::new(&settings.chat_dir, settings.chat_poll())),
        store,
        SupervisorConfig::from_settings(&settings),
    );

    if settings.once {
        let summary = supervisor.reconcile().await;
        tracing::info!(
            started = summary.started.len(),
            stopped = summary.stopped.len(),
            archived = summary.archived,
            "single cycle finished"
        );
        let views = serde_json::json!({
            "live": supervisor.live_json().as_ref(),
            "archive": supervisor.archive_json().as_ref(),
        });
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    let (handle, mut summaries) = Scheduler::new(settings.interval()).start(supervisor);

    loop {
        tokio::select! {
            Some(summary) = summaries.recv() => {
                tracing::info!(
                    live = handle.views().live_count(),
                    archived_total = handle.views().archive_count(),
                    started = summary.started.len(),
                    stopped = summary.stopped.len(),
                    failures = summary.failures,
                    "reconcile cycle finished"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping scheduler");
                handle.abort();
                break;
            }
        }
    }

    Ok(())
}
