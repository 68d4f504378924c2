//! Tracing subscriber setup
//!
//! Events go to stderr so stdout stays free for piping. `RUST_LOG` takes
//! precedence over the default level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive used when `RUST_LOG` is not set
pub const fn default_directive(quiet: bool) -> &'static str {
    if quiet { "warn" } else { "info" }
}

/// Build the level filter for a run
pub fn env_filter(quiet: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(quiet)))
}

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed, which happens
/// when several runs share one process.
pub fn init_logging(quiet: bool) -> bool {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    tracing_subscriber::registry()
        .with(env_filter(quiet))
        .with(layer)
        .try_init()
        .is_ok()
}
