use std::env;
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Log file plus, with `INTEZER_DEBUG=1`, a pretty stdout layer.
///
/// `LOG_FILE_PATH` overrides `default_file`. Keep the returned guard alive
/// until exit or buffered lines are lost.
pub fn init_logger(default_file: &str) -> (WorkerGuard, PathBuf) {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = PathBuf::from(
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| default_file.to_string()),
    );
    let directory = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| default_file.into());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let debug_to_stdout = env::var("INTEZER_DEBUG").map(|v| v == "1").unwrap_or(false);
    let stdout_layer = debug_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .pretty()
            .with_file(false)
            .without_time()
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter_layer)
        .init();

    info!("Logging to {}", log_file_path.display());

    let absolute = std::fs::canonicalize(&log_file_path).unwrap_or(log_file_path);
    (guard, absolute)
}
