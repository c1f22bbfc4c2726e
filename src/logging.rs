use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Installs a fmt subscriber for the process.
///
/// The filter comes from `PHOTO_SYNC_LOG` (via `Config::log_filter`), then
/// `RUST_LOG`, then defaults to `info`. Calling this more than once is harmless,
/// later calls leave the first subscriber in place.
pub fn init_tracing(config: &Config) {
    let filter = match config.log_filter.as_deref() {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
