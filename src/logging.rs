//! Console and file logging
//!
//! Two explicit sinks: a human-readable console layer and a daily-rotating
//! file under the log directory, one file family per subcommand. The
//! returned guard owns the file writer's buffer; `main` holds it for the
//! whole process so the tail of the log survives shutdown.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize console + rotating file logging. `prefix` names the file
/// family (e.g. `enhance_money` → `enhance_money.log.2026-08-28`).
pub fn init(log_dir: &Path, prefix: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, format!("{prefix}.log"));
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time(),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    Ok(guard)
}
