//! Dev server plugin hooks.

use std::sync::Arc;

use axum::Router;

use crate::connections::{ClientRegistry, ConnectionSet};

/// Extension point of the dev server.
///
/// Plugins are applied in registration order: `configure_server` once while
/// the router is built, `transform_index_html` on every served HTML document.
pub trait DevServerPlugin: Send + Sync {
    /// Plugin name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Register middleware and socket handling on the server router.
    fn configure_server(self: Arc<Self>, router: Router, _host: &HostContext) -> Router {
        router
    }

    /// Rewrite an HTML document before it is sent.
    fn transform_index_html(&self, html: String) -> String {
        html
    }
}

/// Server internals exposed to plugins while they configure the router.
#[derive(Clone, Debug)]
pub struct HostContext {
    connections: Arc<ConnectionSet>,
}

impl HostContext {
    pub(crate) fn new(connections: Arc<ConnectionSet>) -> Self {
        Self { connections }
    }

    /// The server's connection set, used to complete socket upgrades.
    pub fn connections(&self) -> &Arc<ConnectionSet> {
        &self.connections
    }

    /// Read-only view of the connected clients.
    pub fn clients(&self) -> Arc<dyn ClientRegistry> {
        Arc::clone(&self.connections) as Arc<dyn ClientRegistry>
    }
}
