//! Intercepted HTTP routes.
//!
//! Requests for the health check, the overlay script and the asset-import
//! stub are answered here and never reach the rest of the server. Everything
//! else is passed on untouched.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::{ASSET_IMPORT_PATH, DevBridge, HEALTH_PATH, LOG_TARGET};

/// Largest asset-import body drained before responding.
const ASSET_IMPORT_BODY_LIMIT: usize = 1024 * 1024;

/// Response for the asset-import stub.
#[derive(Debug, Serialize)]
pub(crate) struct AssetImportResponse {
    status: &'static str,
    message: &'static str,
}

impl AssetImportResponse {
    fn stub() -> Self {
        Self {
            status: "ok",
            message: "asset import stub",
        }
    }
}

/// Answer bridge routes, pass everything else to `next`.
pub(crate) async fn intercept(
    State(bridge): State<Arc<DevBridge>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();

    if mount_matches(HEALTH_PATH, path) {
        return health().into_response();
    }
    if mount_matches(bridge.overlay_path(), path) {
        return overlay_script(&bridge).into_response();
    }
    if mount_matches(ASSET_IMPORT_PATH, path) {
        return asset_import(req).await.into_response();
    }

    next.run(req).await
}

/// Whether `path` falls under middleware mounted at `mount`.
///
/// Follows the usual dev server mount rule: case-insensitive prefix match
/// that must end at the path end or at a `/` or `.` boundary.
pub(crate) fn mount_matches(mount: &str, path: &str) -> bool {
    let Some(head) = path.get(..mount.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(mount) {
        return false;
    }
    matches!(path.as_bytes().get(mount.len()), None | Some(b'/' | b'.'))
}

/// Handle the health check.
fn health() -> &'static str {
    "ok"
}

/// Handle the overlay script request.
fn overlay_script(bridge: &DevBridge) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        bridge.overlay().bytes(),
    )
}

/// Handle the asset-import stub.
///
/// The body is drained and discarded; malformed or oversized bodies are
/// ignored the same way.
async fn asset_import(req: Request) -> Json<AssetImportResponse> {
    let _ = axum::body::to_bytes(req.into_body(), ASSET_IMPORT_BODY_LIMIT).await;
    tracing::info!(target: LOG_TARGET, "asset import stub hit");
    Json(AssetImportResponse::stub())
}
