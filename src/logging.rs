use tracing_subscriber::EnvFilter;

use crate::backend::common::constants::LOG_FILTER_ENV;

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber. `PANEL_LOG` takes an `EnvFilter` directive.
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
