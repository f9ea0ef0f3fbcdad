//! Bridge error types.

use std::path::PathBuf;

/// Errors raised while setting up or running the dev server.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The overlay client source could not be read at startup.
    #[error("Failed to load overlay script {}: {source}", path.display())]
    OverlayScript {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Listen address could not be parsed.
    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    /// I/O error while binding or serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
