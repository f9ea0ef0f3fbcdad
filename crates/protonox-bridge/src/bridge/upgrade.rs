//! Socket upgrade filter.
//!
//! Claims WebSocket upgrades under the bridge's socket prefix and leaves every
//! other request for the rest of the server.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::{LOG_TARGET, SOCKET_PREFIX};
use crate::connections::{ConnectionListener, ConnectionSet};

/// State for the upgrade filter.
#[derive(Clone)]
pub(crate) struct UpgradeState {
    /// Server connection set that takes ownership of upgraded sockets.
    pub(crate) connections: Arc<ConnectionSet>,
    /// Listener attached to every claimed connection.
    pub(crate) listener: Arc<dyn ConnectionListener>,
}

/// Complete matching upgrades, pass everything else to `next`.
pub(crate) async fn filter(
    State(state): State<UpgradeState>,
    req: Request,
    next: Next,
) -> Response {
    if !claims(req.uri().path()) || !is_upgrade_request(req.headers()) {
        return next.run(req).await;
    }

    let (mut parts, _body) = req.into_parts();
    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::debug!(target: LOG_TARGET, path = %parts.uri.path(), %rejection, "Rejected socket upgrade");
            return rejection.into_response();
        }
    };

    tracing::debug!(target: LOG_TARGET, path = %parts.uri.path(), "Claimed socket upgrade");
    let UpgradeState {
        connections,
        listener,
    } = state;
    ws.on_upgrade(move |socket| connections.establish(socket, listener))
}

/// Whether the socket prefix covers `path`.
pub(crate) fn claims(path: &str) -> bool {
    path.starts_with(SOCKET_PREFIX)
}

/// Whether the request asks for a WebSocket upgrade.
fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::ClientHandle;
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    struct Silent;

    impl ConnectionListener for Silent {
        fn on_open(&self, _client: &ClientHandle) {}
        fn on_message(&self, _client: &ClientHandle, _text: &str) {}
    }

    fn router() -> Router {
        let state = UpgradeState {
            connections: Arc::new(ConnectionSet::new()),
            listener: Arc::new(Silent),
        };
        Router::new()
            .fallback(|| async { (StatusCode::NOT_FOUND, "host") })
            .layer(axum::middleware::from_fn_with_state(state, filter))
    }

    fn upgrade_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_claims_prefix() {
        assert!(claims("/__protonox/ws"));
        assert!(claims("/__protonox/ws/session"));
        assert!(claims("/__protonox/wsx"));
        assert!(!claims("/foo/ws-not-matching"));
        assert!(!claims("/__protonox/w"));
        assert!(!claims("/ws"));
    }

    #[tokio::test]
    async fn test_non_matching_upgrade_reaches_host() {
        let resp = router()
            .oneshot(upgrade_request("/foo/ws-not-matching"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(resp.into_body(), 1_000).await.unwrap();
        assert_eq!(&body[..], b"host");
    }

    #[tokio::test]
    async fn test_plain_request_on_socket_path_reaches_host() {
        let req = axum::http::Request::builder()
            .uri("/__protonox/ws")
            .body(Body::empty())
            .unwrap();

        let resp = router().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_matching_upgrade_is_claimed() {
        // Without a real connection the handshake cannot complete, but the
        // filter must answer it instead of the host.
        let resp = router()
            .oneshot(upgrade_request("/__protonox/ws"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UPGRADE_REQUIRED);
    }
}
