use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
const LOG_FILE_NAME: &str = "assessment.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Expands a bare level such as `debug` so dependency noise stays at its own
/// level. Full directive strings are used untouched.
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        return "info,tower_http=info,sqlx=warn,hyper=warn".to_string();
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("{level},skills_assessment_backend={level},tower_http=info,sqlx=warn,hyper=warn")
}

pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(filter_directives(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let file = config.log_dir.as_deref().and_then(open_log_file);
    let guard = match file {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();
            Some(FileLogGuard { _guard: guard })
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .init();
            None
        }
    };

    let store = if config.database_url.is_some() { "sqlite" } else { "memory" };
    tracing::info!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        ml_service = %config.ml.base_url,
        ml_api_key = config.ml.api_key.is_some(),
        store,
        log_dir = ?config.log_dir,
        "tracing initialised"
    );

    guard
}

fn open_log_file(
    dir: &Path,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
    Some(tracing_appender::non_blocking(appender))
}
