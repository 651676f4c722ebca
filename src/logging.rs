//! Tracing subscriber setup.

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG`, or `default_filter` when the variable is unset or invalid.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Registry with `filter` and a stderr fmt layer.
pub fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(fmt_layer)
}

/// Install [`subscriber`] as the global default.
///
/// Returns `false` if a global subscriber was already installed; the host
/// application's subscriber is left in place.
pub fn init(default_filter: &str) -> bool {
    subscriber(env_filter(default_filter)).try_init().is_ok()
}
