//! Tracing setup
//!
//! Logs go to stderr so command output on stdout stays readable. `RUST_LOG`
//! wins over the defaults (`info`, or `debug` with `--debug`).

use tracing_subscriber::EnvFilter;

pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Ignore the error when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .try_init();
}
