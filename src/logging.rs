//! File logging.
//!
//! Logs go to a file so stdout carries only command output.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter directives, e.g. `stockdash=debug`.
pub const LOG_ENV: &str = "STOCKDASH_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Default log directory under the platform data dir.
pub fn default_log_dir() -> PathBuf {
  dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .unwrap_or_else(std::env::temp_dir)
    .join("stockdash")
    .join("log")
}

/// Install the global subscriber writing to `log_dir/stockdash.log`.
///
/// Only the first call has an effect. Failing to create the directory
/// leaves logging disabled rather than aborting the command.
pub fn init(log_dir: &Path) {
  LOGGER_INITIALIZED.get_or_init(|| {
    if std::fs::create_dir_all(log_dir).is_err() {
      return;
    }

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_appender = tracing_appender::rolling::never(log_dir, "stockdash.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(
      fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(false)
        .with_filter(filter),
    );

    if subscriber.try_init().is_err() {
      tracing::debug!("global tracing subscriber already set");
    }

    tracing::info!(pid = std::process::id(), log_dir = %log_dir.display(), "logging initialized");

    // The writer flushes on a background thread for as long as the guard lives.
    std::mem::forget(guard);
  });
}
