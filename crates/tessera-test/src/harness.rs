//! Tracing setup for tests.

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber filtered by `filter`, or by `RUST_LOG`
/// when it is set.
///
/// Only the first call in a test binary installs anything.
pub fn setup_test_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .try_init();
}

/// [`setup_test_logging`] at `warn`, plus `debug` for the gateway session so
/// reconnect decisions show up in failing test output.
pub fn setup_test_logging_default() {
    setup_test_logging("warn,tessera_discord::gateway=debug");
}
