//! Static file serving.
//!
//! Serves files below the site root with SPA fallback. HTML documents pass
//! through the plugin transform chain before they are sent.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::state::AppState;

/// Document served for the site root and for directories.
const INDEX_FILE: &str = "index.html";

/// Create router for static file serving with SPA fallback.
pub(crate) fn static_router() -> Router<Arc<AppState>> {
    Router::new().fallback(serve_file)
}

/// Serve a file from the site root or fall back to `index.html`.
async fn serve_file(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response {
    let Some(relative) = sanitize_path(req.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut file_path = state.root_dir.join(&relative);
    if file_path.is_dir() {
        file_path.push(INDEX_FILE);
    }

    if let Ok(content) = tokio::fs::read(&file_path).await {
        return file_response(&state, &file_path, content);
    }

    // SPA fallback: extensionless paths are client-side routes
    let is_spa_route = !relative.contains('.');
    if is_spa_route {
        let index_path = state.root_dir.join(INDEX_FILE);
        if let Ok(content) = tokio::fs::read(&index_path).await {
            return file_response(&state, &index_path, content);
        }
    }

    StatusCode::NOT_FOUND.into_response()
}

/// Build the response for a file, rewriting HTML documents.
fn file_response(state: &AppState, path: &Path, content: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    if mime.essence_str() == "text/html" {
        match String::from_utf8(content) {
            Ok(html) => {
                let html = state.transform_html(html);
                let content_type = [(header::CONTENT_TYPE, "text/html; charset=utf-8")];
                return (content_type, html).into_response();
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "Serving non-UTF-8 HTML untransformed");
                return ([(header::CONTENT_TYPE, mime.to_string())], err.into_bytes())
                    .into_response();
            }
        }
    }

    ([(header::CONTENT_TYPE, mime.to_string())], content).into_response()
}

/// Decode a request path into a relative file path.
///
/// Returns `None` for paths that are not valid UTF-8 or that try to leave
/// the site root.
fn sanitize_path(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') => return None,
            s => segments.push(s),
        }
    }

    Some(segments.join("/"))
}
