//! Overlay client source.

use std::path::Path;

use axum::body::Bytes;

use crate::error::BridgeError;

/// The companion client script, loaded once at startup.
///
/// Cloning shares the underlying buffer.
#[derive(Clone, Debug)]
pub struct OverlayScript {
    source: Bytes,
}

impl OverlayScript {
    /// Read the script from disk.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OverlayScript`] if the file cannot be read.
    /// The content is taken as is, whatever its encoding.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let source = match std::fs::read(path) {
            Ok(source) => source,
            Err(source) => {
                return Err(BridgeError::OverlayScript {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        tracing::debug!(path = %path.display(), bytes = source.len(), "Loaded overlay script");
        Ok(Self {
            source: Bytes::from(source),
        })
    }

    /// Wrap script source that is already in memory.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Bytes::from(source.into()),
        }
    }

    /// Script bytes, exactly as loaded.
    pub fn bytes(&self) -> Bytes {
        self.source.clone()
    }
}
