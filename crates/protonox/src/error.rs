//! CLI error types.

use protonox_bridge::BridgeError;
use protonox_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Bridge(#[from] BridgeError),

    #[error("{0}")]
    Runtime(#[from] std::io::Error),
}
