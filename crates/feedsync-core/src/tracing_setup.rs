use std::fs::OpenOptions;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub fn init_tracing() {
    init_tracing_with_level(LevelFilter::INFO);
}

/// Install a stderr fmt layer, plus a DEBUG file layer when
/// `FEEDSYNC_LOG_FILE` names a writable path.
pub fn init_tracing_with_level(level: LevelFilter) {
    let file_logging = std::env::var("FEEDSYNC_LOG_FILE").ok();

    let registry = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(level),
    );

    let file = file_logging.as_ref().and_then(|log_path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| eprintln!("Failed to open log file {}: {}", log_path, e))
            .ok()
    });

    if let Some(file) = file {
        let file_layer = fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(LevelFilter::DEBUG);
        // A subscriber may already be installed (tests, embedding apps)
        let _ = registry.with(file_layer).try_init();
    } else {
        let _ = registry.try_init();
    }
}
