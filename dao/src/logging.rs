//! Logging setup driven by [`DaoConfig`].

use crate::DaoConfig;
pub use hopestream_utils::LogFormat;

/// Install the global subscriber with the config's format and level.
///
/// `RUST_LOG` overrides the level when set. Returns `false` if a subscriber
/// was already installed.
pub fn init_logging(config: &DaoConfig) -> bool {
    hopestream_utils::init_logging(config.log_format, &config.log_level)
}
