//! Log subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `PREVIEW_LOG=debug`.
pub const LOG_ENV: &str = "PREVIEW_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr fmt subscriber filtered by `PREVIEW_LOG`. Later calls,
/// or calls after a host installed its own subscriber, are no-ops.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
