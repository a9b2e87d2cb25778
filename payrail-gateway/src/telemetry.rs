//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a formatted tracing subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
