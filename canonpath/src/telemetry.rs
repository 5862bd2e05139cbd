use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialize tracing.
///
/// - stderr: human logs. stdout is reserved for command output.
/// - file (when `log_dir` is set): JSONL, hourly rolling, `<log_dir>/<service>.jsonl`.
/// - env: RUST_LOG controls level (e.g. `info,canonpath=debug`).
pub fn init_tracing(service: &str, log_dir: Option<&Path>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let json_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create log_dir failed: {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::hourly(dir, format!("{service}.jsonl"));
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

            // Guard must outlive the process, otherwise buffered lines are dropped.
            let _ = TRACING_GUARD.set(guard);

            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_writer(file_writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(())
}
