//! Router construction.
//!
//! Builds the axum router: static files first, then every plugin's
//! middleware, then the response layers shared by all routes.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::headers;
use crate::plugin::HostContext;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `host` - Server internals handed to plugins
pub(crate) fn create_router(state: Arc<AppState>, host: &HostContext) -> Router {
    let plugins = state.plugins.clone();
    let mut router = static_files::static_router().with_state(state);

    for plugin in plugins {
        tracing::debug!(plugin = plugin.name(), "Configuring plugin");
        router = plugin.configure_server(router, host);
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(headers::cache_control_layer())
            .layer(headers::content_type_options_layer()),
    )
}
