//! Tracing subscriber setup.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global fmt subscriber once per process.
///
/// `RUST_LOG` takes precedence over `default_filter`. Later calls are no-ops,
/// as is the first call when another subscriber is already installed.
pub fn install_tracing_subscriber(default_filter: &str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
