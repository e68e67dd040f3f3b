use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Track live broadcasts and archive their chat reports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "broadcast-monitor",
    about = "Track live broadcasts and archive their chat reports",
    version
)]
pub struct Settings {
    /// Seconds between reconcile cycles (1-3600)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub interval: u64,

    /// Number of days of archived reports kept in memory
    #[arg(long, default_value = "7")]
    pub history_days: u32,

    /// Directory archive files are written to
    #[arg(long, default_value = "archives")]
    pub archives_dir: PathBuf,

    /// Also dump every chat message of a finished broadcast
    #[arg(long)]
    pub dump_chat: bool,

    /// JSON document listing the currently live broadcasts
    #[arg(long, default_value = "live.json")]
    pub live_file: PathBuf,

    /// Directory of per-broadcast JSONL chat logs
    #[arg(long, default_value = "chat")]
    pub chat_dir: PathBuf,

    /// Directory of grouper JSON files
    #[arg(long, default_value = "groupers")]
    pub groupers_dir: PathBuf,

    /// Chat log poll interval in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(50..))]
    pub chat_poll_ms: u64,

    /// Seconds the live view stays cached
    #[arg(long, default_value = "5")]
    pub live_cache_secs: u64,

    /// Seconds the archive view stays cached
    #[arg(long, default_value = "30")]
    pub archive_cache_secs: u64,

    /// Timezone used for archive file names (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Run a single reconcile cycle, print both views and exit
    #[arg(long)]
    pub once: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and resolve `"auto"` values.
    pub fn load() -> Self {
        Self::parse().resolve()
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(args).resolve()
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    pub fn resolve(mut self) -> Self {
        if self.timezone == "auto" {
            self.timezone = crate::time_utils::get_system_timezone();
        }

        // --debug overrides log level.
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }

        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Retention window for in-memory archives, in seconds.
    pub fn retention_secs(&self) -> f64 {
        f64::from(self.history_days) * 86_400.0
    }

    pub fn chat_poll(&self) -> Duration {
        Duration::from_millis(self.chat_poll_ms)
    }

    pub fn live_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.live_cache_secs)
    }

    pub fn archive_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.archive_cache_secs)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
