//! Logging setup for tests and host applications.
//!
//! The library itself only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. [`init`] installs a stderr formatter filtered by
//! `RUST_LOG` (default `info`) and may be called any number of times.

use std::io;
use tracing_subscriber::EnvFilter;

/// Install the default subscriber. Later calls, or calls after another
/// subscriber was installed, are no-ops.
pub fn init() {
    init_with_default("info");
}

/// Like [`init`], with `directives` used when `RUST_LOG` is unset.
pub fn init_with_default(directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init_with_default("debug");
        tracing::info!("logging initialized twice without panicking");
    }
}
