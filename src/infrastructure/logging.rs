//! Logging initialization
//!
//! Console output plus a non-blocking daily-rolling file under `logs/`,
//! filtered through `RUST_LOG` (default `info`). The returned guard must be
//! held for the lifetime of the process so buffered file output is flushed.

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub fn init_logging() -> Result<WorkerGuard> {
    let log_dir = Path::new("logs");
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, "catalog-sync.log");
    let (file_writer, guard) = non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()?;

    Ok(guard)
}
