use std::io;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Installs the global subscriber. Our own crates log at `level`, everything
/// else is held to WARN.
pub(crate) fn setup_tracing(level: LevelFilter) {
    let own_level = level.into_level();
    let filter_layer = tracing_subscriber::filter::filter_fn(move |metadata| {
        let Some(own_level) = own_level else {
            return false;
        };
        let target = metadata.target();
        let is_ours = target.starts_with("morphsculpt") || target.starts_with("core");
        let effective_level = if is_ours { own_level } else { Level::WARN.min(own_level) };
        metadata.level() <= &effective_level
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter_layer))
        .init();
}

pub(crate) fn parse_level(value: &str) -> Result<LevelFilter, String> {
    match value.to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::OFF),
        "error" => Ok(LevelFilter::ERROR),
        "warn" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(format!("unknown log level '{other}'")),
    }
}
