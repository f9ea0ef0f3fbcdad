//! Application state.
//!
//! Shared state for the static file handler.

use std::path::PathBuf;
use std::sync::Arc;

use crate::plugin::DevServerPlugin;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Directory files are served from.
    pub(crate) root_dir: PathBuf,
    /// Registered plugins, in registration order.
    pub(crate) plugins: Vec<Arc<dyn DevServerPlugin>>,
}

impl AppState {
    /// Run an HTML document through every plugin's transform.
    pub(crate) fn transform_html(&self, html: String) -> String {
        self.plugins
            .iter()
            .fold(html, |html, plugin| plugin.transform_index_html(html))
    }
}
