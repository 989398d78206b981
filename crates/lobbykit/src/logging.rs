//! Log subscriber setup for binaries and adapters embedding lobbykit.
//!
//! The library itself only emits `tracing` events; nothing is printed
//! until the host installs a subscriber, either its own or this one.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable read before `RUST_LOG`.
pub const LOG_ENV: &str = "LOBBYKIT_LOG";

/// Builds the filter: `LOBBYKIT_LOG`, then `RUST_LOG`, then `default`.
/// An unparsable `default` falls back to `info`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a `fmt` subscriber as the global default.
///
/// Returns `false` if a global subscriber was already set; the existing
/// one is kept.
pub fn init(default: &str) -> bool {
    fmt()
        .with_env_filter(env_filter(default))
        .with_target(true)
        .try_init()
        .is_ok()
}
