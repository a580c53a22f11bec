use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "sprintdeck=info,tower_http=info";
const LOG_FILE_PREFIX: &str = "sprintdeck.log";

/// Install the global subscriber.
///
/// Logs go to stdout unless `logging.directory` is set, in which case they
/// are written to a daily-rotated file there. `RUST_LOG` overrides the
/// default filter. The returned guard flushes buffered lines on drop and
/// must live until shutdown.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let (writer, guard, ansi) = match &config.directory {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      (writer, guard, false)
    }
    None => {
      let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
      (writer, guard, true)
    }
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
