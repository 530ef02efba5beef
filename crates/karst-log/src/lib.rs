//! Structured logging for karst.
//!
//! Span-based, filterable logging via the `tracing` ecosystem: console
//! output with uptime timestamps and module paths, plus an optional JSON
//! file for post-mortem analysis of long generation runs. `RUST_LOG`
//! overrides whatever level the config asks for.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `level` is the config-provided filter string; empty or absent falls back
/// to the default. When `log_dir` is given, a JSON copy of every event is
/// appended to `karst.log` inside it.
pub fn init_logging(level: Option<&str>, log_dir: Option<&Path>) {
    let filter_str = match level {
        Some(level) if !level.is_empty() => level.to_string(),
        _ => default_filter().to_string(),
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join("karst.log"))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();
        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// The default filter: info everywhere, generation internals at debug.
pub fn default_filter() -> &'static str {
    "info,karst_cavemap=debug"
}
