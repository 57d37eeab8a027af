use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "depression_relay=debug,tower_http=debug";

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
