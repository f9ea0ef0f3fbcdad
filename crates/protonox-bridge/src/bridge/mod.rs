//! Protonox Studio dev bridge.
//!
//! Hooks the studio into a running dev server:
//!
//! - `/__protonox/health` answers `ok`
//! - the overlay path serves the companion client script
//! - `/__protonox/assets/import` answers a fixed JSON stub
//! - upgrades under `/__protonox/ws` become relay sockets: each client is
//!   greeted with `{"type":"hello","overlay":true}` and every message is
//!   rebroadcast verbatim to all connected clients, sender included
//! - served HTML gets a `<script type="module">` tag for the overlay

mod html;
mod overlay;
mod relay;
mod routes;
mod upgrade;

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use protonox_config::DEFAULT_OVERLAY_PATH;

pub use overlay::OverlayScript;

use crate::error::BridgeError;
use crate::plugin::{DevServerPlugin, HostContext};
use relay::Relay;
use upgrade::UpgradeState;

/// Tracing target for all bridge diagnostics.
pub const LOG_TARGET: &str = "protonox";

/// Health check path.
pub const HEALTH_PATH: &str = "/__protonox/health";

/// Asset-import stub path.
pub const ASSET_IMPORT_PATH: &str = "/__protonox/assets/import";

/// Prefix of socket upgrade paths claimed by the bridge.
pub const SOCKET_PREFIX: &str = "/__protonox/ws";

/// Construction options.
#[derive(Clone, Debug, Default)]
pub struct BridgeOptions {
    /// Where the overlay script is served; defaults to [`DEFAULT_OVERLAY_PATH`].
    pub overlay_path: Option<String>,
}

/// The dev bridge plugin.
#[derive(Debug)]
pub struct DevBridge {
    overlay_path: String,
    overlay: OverlayScript,
}

impl DevBridge {
    /// Create a bridge serving an already loaded overlay script.
    pub fn new(options: BridgeOptions, overlay: OverlayScript) -> Self {
        Self {
            overlay_path: options
                .overlay_path
                .unwrap_or_else(|| DEFAULT_OVERLAY_PATH.to_owned()),
            overlay,
        }
    }

    /// Create a bridge, reading the overlay script from `script_path`.
    ///
    /// # Errors
    ///
    /// Fails if the script cannot be read. No bridge exists in that case, so
    /// a server never starts with a broken overlay route.
    pub fn load(options: BridgeOptions, script_path: &Path) -> Result<Self, BridgeError> {
        let overlay = OverlayScript::load(script_path)?;
        Ok(Self::new(options, overlay))
    }

    /// URL path of the overlay script.
    pub fn overlay_path(&self) -> &str {
        &self.overlay_path
    }

    /// The loaded overlay script.
    pub fn overlay(&self) -> &OverlayScript {
        &self.overlay
    }

    /// Inject the overlay script tag into an HTML document.
    pub fn transform_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
        html::inject_overlay(html, &self.overlay_path)
    }
}

impl DevServerPlugin for DevBridge {
    fn name(&self) -> &'static str {
        "protonox-studio"
    }

    fn configure_server(self: Arc<Self>, router: Router, host: &HostContext) -> Router {
        let upgrade_state = UpgradeState {
            connections: Arc::clone(host.connections()),
            listener: Arc::new(Relay::new(host.clients())),
        };

        router
            .layer(from_fn_with_state(upgrade_state, upgrade::filter))
            .layer(from_fn_with_state(self, routes::intercept))
    }

    fn transform_index_html(&self, html: String) -> String {
        let injected = match self.transform_html(&html) {
            Cow::Owned(injected) => Some(injected),
            Cow::Borrowed(_) => None,
        };
        injected.unwrap_or(html)
    }
}
