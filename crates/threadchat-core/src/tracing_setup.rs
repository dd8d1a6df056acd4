use std::fs::OpenOptions;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const ENV_LOG_FILE: &str = "THREADCHAT_LOG_FILE";

/// Install the global subscriber.
///
/// Logs go to stderr filtered by `RUST_LOG` (default `info`). When
/// `THREADCHAT_LOG_FILE` is set, a debug-level copy is appended to that file.
pub fn init_tracing() {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let registry = tracing_subscriber::registry().with(stderr_layer);

    let file_layer = std::env::var(ENV_LOG_FILE).ok().and_then(|log_path| {
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG),
            ),
            Err(e) => {
                eprintln!("Could not open log file {}: {}", log_path, e);
                None
            }
        }
    });

    // try_init: a second call (e.g. from tests) keeps the first subscriber
    let _ = registry.with(file_layer).try_init();
}
