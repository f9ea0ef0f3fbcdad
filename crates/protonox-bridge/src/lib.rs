//! Dev server bridge for Protonox Studio.
//!
//! This crate provides a small axum dev server and the Protonox Studio
//! bridge plugin that runs inside it:
//!
//! - Static files from a site root, with SPA fallback
//! - Overlay script injection into every served HTML document
//! - Health check, overlay script and asset-import stub routes
//! - A WebSocket relay for the studio and its overlay clients
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use protonox_bridge::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         root_dir: PathBuf::from("public"),
//!         overlay_script: PathBuf::from("web/overlay_client.js"),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum dev server
//!                        │
//!                        ├─► DevBridge interceptors (health, overlay, assets)
//!                        │
//!                        ├─► DevBridge upgrade filter ──► ConnectionSet
//!                        │                                    │
//!                        │                     Relay ◄────────┘ (hello + broadcast)
//!                        │
//!                        └─► Static files ──► DevBridge HTML transform
//! ```

mod app;
mod bridge;
mod connections;
mod error;
mod middleware;
mod plugin;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;

pub use bridge::{
    ASSET_IMPORT_PATH, BridgeOptions, DevBridge, HEALTH_PATH, LOG_TARGET, OverlayScript,
    SOCKET_PREFIX,
};
pub use connections::{
    ClientHandle, ClientRegistry, ConnectionId, ConnectionListener, ConnectionSet, SendError,
};
pub use error::BridgeError;
pub use plugin::{DevServerPlugin, HostContext};

use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory served by the dev server.
    pub root_dir: PathBuf,
    /// URL path of the overlay script.
    pub overlay_path: String,
    /// File the overlay script is loaded from.
    pub overlay_script: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 4173,
            root_dir: PathBuf::from("."),
            overlay_path: protonox_config::DEFAULT_OVERLAY_PATH.to_owned(),
            overlay_script: PathBuf::from(protonox_config::DEFAULT_OVERLAY_SCRIPT),
        }
    }
}

/// A dev server with its plugins.
pub struct DevServer {
    root_dir: PathBuf,
    plugins: Vec<Arc<dyn DevServerPlugin>>,
    connections: Arc<ConnectionSet>,
}

impl DevServer {
    /// Create a server for the given site root.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            plugins: Vec::new(),
            connections: Arc::new(ConnectionSet::new()),
        }
    }

    /// Register a plugin. Plugins run in registration order.
    #[must_use]
    pub fn plugin(mut self, plugin: Arc<dyn DevServerPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Live socket connections.
    pub fn connections(&self) -> &Arc<ConnectionSet> {
        &self.connections
    }

    /// Build the router with every plugin applied.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            root_dir: self.root_dir.clone(),
            plugins: self.plugins.clone(),
        });
        let host = HostContext::new(Arc::clone(&self.connections));
        app::create_router(state, &host)
    }
}

/// Run the dev server with the Protonox bridge.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the overlay script cannot be loaded, or if the server
/// fails to bind or serve.
pub async fn run_server(config: ServerConfig) -> Result<(), BridgeError> {
    // Loaded before anything binds: a missing script must stop startup
    let bridge = DevBridge::load(
        BridgeOptions {
            overlay_path: Some(config.overlay_path.clone()),
        },
        &config.overlay_script,
    )?;

    let server = DevServer::new(config.root_dir.clone()).plugin(Arc::new(bridge));
    let app = server.router();

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, root = %config.root_dir.display(), "Starting dev server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from Protonox config.
#[must_use]
pub fn server_config_from_config(config: &protonox_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root_dir: config.site_resolved.root_dir.clone(),
        overlay_path: config.bridge_resolved.overlay_path.clone(),
        overlay_script: config.bridge_resolved.overlay_script.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<!doctype html><html><body><main>app</main></body></html>",
        )
        .unwrap();
        dir
    }

    fn server(root: &std::path::Path) -> DevServer {
        let bridge = DevBridge::new(
            BridgeOptions::default(),
            OverlayScript::from_source("export {};"),
        );
        DevServer::new(root).plugin(Arc::new(bridge))
    }

    async fn get(router: Router, uri: &str) -> axum::response::Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_bridge_routes_win_over_static_files() {
        let dir = site();
        std::fs::create_dir_all(dir.path().join("__protonox")).unwrap();
        std::fs::write(dir.path().join("__protonox/health"), "from disk").unwrap();

        let resp = get(server(dir.path()).router(), "/__protonox/health").await;

        let body = axum::body::to_bytes(resp.into_body(), 1_000).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_index_html_is_injected_once() {
        let dir = site();
        let router = server(dir.path()).router();

        let resp = get(router, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(html.matches("/__protonox/studio-client.js").count(), 1);
        assert!(html.contains(
            r#"<main>app</main><script type="module" src="/__protonox/studio-client.js"></script></body>"#
        ));
    }

    #[tokio::test]
    async fn test_dev_headers_on_every_response() {
        let dir = site();

        for uri in ["/", "/__protonox/health", "/missing.png"] {
            let resp = get(server(dir.path()).router(), uri).await;
            assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");
            assert_eq!(resp.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        }
    }

    #[tokio::test]
    async fn test_run_server_fails_without_overlay_script() {
        let dir = site();
        let config = ServerConfig {
            root_dir: dir.path().to_path_buf(),
            overlay_script: dir.path().join("missing.js"),
            port: 0,
            ..ServerConfig::default()
        };

        let err = run_server(config).await.unwrap_err();

        assert!(matches!(err, BridgeError::OverlayScript { .. }));
    }

    #[test]
    fn test_server_config_from_config() {
        let config = protonox_config::Config::default();

        let server_config = server_config_from_config(&config);

        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 4173);
        assert_eq!(server_config.overlay_path, "/__protonox/studio-client.js");
        assert_eq!(
            server_config.overlay_script,
            PathBuf::from("./web/overlay_client.js")
        );
    }
}
