//! Socket connection lifecycle and message relay.

use std::sync::Arc;

use super::LOG_TARGET;
use crate::connections::{ClientHandle, ClientRegistry, ConnectionListener};

/// Greeting sent to every client right after it connects.
const HELLO: &str = r#"{"type":"hello","overlay":true}"#;

/// Result of relaying one message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RelayOutcome {
    /// Clients the message was queued for.
    pub(crate) delivered: usize,
    /// Clients whose connection was already gone.
    pub(crate) failed: usize,
}

/// Greets new clients and rebroadcasts every message to all clients.
pub(crate) struct Relay {
    clients: Arc<dyn ClientRegistry>,
}

impl Relay {
    pub(crate) fn new(clients: Arc<dyn ClientRegistry>) -> Self {
        Self { clients }
    }
}

impl ConnectionListener for Relay {
    fn on_open(&self, client: &ClientHandle) {
        tracing::info!(target: LOG_TARGET, connection = %client.id(), "ws client connected");
        if let Err(err) = client.send_text(HELLO) {
            tracing::warn!(target: LOG_TARGET, error = %err, "Failed to greet client");
        }
    }

    fn on_message(&self, client: &ClientHandle, text: &str) {
        tracing::info!(target: LOG_TARGET, connection = %client.id(), payload = text, "ws msg");
        let outcome = broadcast(self.clients.as_ref(), text);
        tracing::debug!(
            target: LOG_TARGET,
            delivered = outcome.delivered,
            failed = outcome.failed,
            "Relayed message"
        );
    }

    fn on_close(&self, client: &ClientHandle) {
        tracing::debug!(target: LOG_TARGET, connection = %client.id(), "ws client disconnected");
    }
}

/// Send `payload` unchanged to every connected client, sender included.
///
/// A failed send is logged and skipped so the remaining clients still get
/// the message.
pub(crate) fn broadcast(clients: &dyn ClientRegistry, payload: &str) -> RelayOutcome {
    let mut outcome = RelayOutcome::default();
    for client in clients.clients() {
        match client.send_text(payload) {
            Ok(()) => outcome.delivered += 1,
            Err(err) => {
                outcome.failed += 1;
                tracing::warn!(target: LOG_TARGET, connection = %client.id(), error = %err, "Failed to relay message");
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct FixedClients(Vec<ClientHandle>);

    impl ClientRegistry for FixedClients {
        fn clients(&self) -> Vec<ClientHandle> {
            self.0.clone()
        }
    }

    fn clients(n: usize) -> (Vec<ClientHandle>, Vec<UnboundedReceiver<String>>) {
        (0..n).map(|_| ClientHandle::channel()).unzip()
    }

    #[test]
    fn test_hello_frame() {
        let json: serde_json::Value = serde_json::from_str(HELLO).unwrap();
        assert_eq!(json, serde_json::json!({"type": "hello", "overlay": true}));
        // Field order on the wire is fixed
        assert!(HELLO.starts_with(r#"{"type":"hello""#));
    }

    #[test]
    fn test_on_open_greets_only_new_client() {
        let (handles, mut receivers) = clients(2);
        let relay = Relay::new(Arc::new(FixedClients(vec![handles[0].clone()])));

        relay.on_open(&handles[1]);

        assert!(receivers[0].try_recv().is_err());
        assert_eq!(receivers[1].try_recv().unwrap(), HELLO);
        assert!(receivers[1].try_recv().is_err());
    }

    #[test]
    fn test_broadcast_reaches_every_client_once() {
        let (handles, mut receivers) = clients(3);
        let registry = FixedClients(handles);
        let payload = "{\"kind\":\"select\", \"id\": 7}\n\u{1f600}";

        let outcome = broadcast(&registry, payload);

        assert_eq!((outcome.delivered, outcome.failed), (3, 0));
        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), payload);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_message_relayed_back_to_sender() {
        let (handles, mut receivers) = clients(1);
        let sender = handles[0].clone();
        let relay = Relay::new(Arc::new(FixedClients(handles)));

        relay.on_message(&sender, "echo");

        assert_eq!(receivers[0].try_recv().unwrap(), "echo");
    }

    #[test]
    fn test_broadcast_skips_closed_client() {
        let (handles, mut receivers) = clients(3);
        let closed = receivers.remove(1);
        drop(closed);
        let registry = FixedClients(handles);

        let outcome = broadcast(&registry, "still delivered");

        assert_eq!((outcome.delivered, outcome.failed), (2, 1));
        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), "still delivered");
        }
    }

    #[test]
    fn test_broadcast_with_no_clients() {
        let outcome = broadcast(&FixedClients(Vec::new()), "nobody");
        assert_eq!(outcome, RelayOutcome::default());
    }

    #[test]
    fn test_relay_preserves_order_per_sender() {
        let (handles, mut receivers) = clients(2);
        let sender = handles[0].clone();
        let relay = Relay::new(Arc::new(FixedClients(handles)));

        for text in ["1", "2", "3"] {
            relay.on_message(&sender, text);
        }

        for rx in &mut receivers {
            let received: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
            assert_eq!(received, ["1", "2", "3"]);
        }
    }
}
