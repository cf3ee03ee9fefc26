//! Tracing setup
//!
//! All records go to a non-blocking rolling file; text mode additionally
//! mirrors to stdout for local runs. The returned guard must stay alive
//! for the life of the process or buffered records are lost.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender = rolling_appender(config);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // RUST_LOG wins over the configured level
    let default_directives = if config.enable_tracing {
        config.log_level.clone()
    } else {
        format!("{},MBANK=off", config.log_level)
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // Structured shipping format, file only
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(writer).with_ansi(false))
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }

    guard
}

fn rolling_appender(config: &AppConfig) -> RollingFileAppender {
    match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    }
}
