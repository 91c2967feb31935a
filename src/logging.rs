use crate::config::Settings;
use tracing_subscriber::EnvFilter;

/// Log to stderr; `RUST_LOG` wins over the configured level.
pub fn init(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    // stdout belongs to the terminal UI
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
