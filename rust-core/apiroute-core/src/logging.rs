//! # Logging
//!
//! Installs the global `tracing` subscriber. A `RUST_LOG` filter is used as
//! given; without one, the filter is `apiroute_core=info`.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "apiroute_core=info";

/// Initialize tracing, as JSON lines or human-readable output
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn env_filter() -> EnvFilter {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

/// The `RUST_LOG` value if set and valid, the default directive otherwise
fn filter_from(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
