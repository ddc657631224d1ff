//! Tracing setup for binaries built on Tollgate.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info,tollgate=debug"`) when it is unset or
/// unparsable.
///
/// Returns `false` if a global subscriber was already installed, which
/// happens when tests or a host application set one up first.
pub fn init(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}
