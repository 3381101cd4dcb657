//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber filtered by `filter`, falling back
/// to `RUST_LOG` and then `info`.
///
/// Returns `false` if a global subscriber was already installed, which
/// makes repeated calls harmless.
pub fn init_logging(filter: Option<&str>) -> bool {
    let env_filter = filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
