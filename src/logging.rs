//! Logging bootstrap.
//!
//! The library only emits through the `log` facade; the binary installs
//! `env_logger` once at startup. `RUST_LOG` overrides the default level.

use env_logger::{Builder, Env};
use log::info;

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Install the global logger. Safe to call more than once; later calls are
/// ignored.
pub fn init_logging() {
    let env = Env::default().default_filter_or(default_log_level());
    let installed = Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_ok();
    if installed {
        info!(
            "event=app_start module=core status=ok platform={} version={}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        assert!(!default_log_level().is_empty());
    }
}
