//! Live socket connections owned by the dev server.
//!
//! The server keeps every open WebSocket in a [`ConnectionSet`]. Plugins never
//! own connections: they get notified through [`ConnectionListener`] and can
//! read the live set through the [`ClientRegistry`] capability.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of a single socket connection.
pub type ConnectionId = Uuid;

/// Failure to queue a message for a client.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The connection's socket task has already exited.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

/// Send-capable handle to one connected client.
///
/// Cloning is cheap; all clones feed the same socket.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    /// Create a handle together with the receiving end of its outbound queue.
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            tx,
        };
        (handle, rx)
    }

    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a text message for delivery.
    ///
    /// Messages queued from one task reach the socket in the order they were queued.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] once the connection has gone away.
    pub fn send_text(&self, text: &str) -> Result<(), SendError> {
        self.tx
            .send(text.to_owned())
            .map_err(|_| SendError::Closed(self.id))
    }
}

/// Read access to the clients that are currently connected.
pub trait ClientRegistry: Send + Sync {
    /// Snapshot of every live client.
    fn clients(&self) -> Vec<ClientHandle>;
}

/// Callbacks invoked by the server over a connection's lifetime.
///
/// Each callback runs exactly once per event, on the connection's own task.
pub trait ConnectionListener: Send + Sync {
    /// The handshake completed. Runs before the client becomes visible
    /// through [`ClientRegistry`], so anything sent here arrives first.
    fn on_open(&self, client: &ClientHandle);

    /// A text message arrived from `client`.
    fn on_message(&self, client: &ClientHandle, text: &str);

    /// The connection closed, from either end.
    fn on_close(&self, _client: &ClientHandle) {}
}

/// Registry of open socket connections.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    clients: RwLock<HashMap<ConnectionId, ClientHandle>>,
}

impl ConnectionSet {
    /// Create an empty connection set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open connections.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn len(&self) -> usize {
        self.clients.read().unwrap().len()
    }

    /// Whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, client: ClientHandle) {
        self.clients.write().unwrap().insert(client.id, client);
    }

    fn remove(&self, id: ConnectionId) {
        self.clients.write().unwrap().remove(&id);
    }

    /// Drive an upgraded socket until it closes.
    ///
    /// Announces the connection to `listener`, publishes it in the set, then
    /// pumps inbound frames to the listener and queued outbound messages to the
    /// socket. The entry is removed as soon as the socket goes away.
    pub async fn establish(
        self: Arc<Self>,
        mut socket: WebSocket,
        listener: Arc<dyn ConnectionListener>,
    ) {
        let (client, mut outbound) = ClientHandle::channel();

        listener.on_open(&client);
        self.insert(client.clone());
        tracing::debug!(connection = %client.id, open = self.len(), "Socket connection registered");

        loop {
            tokio::select! {
                queued = outbound.recv() => {
                    // The set and `client` both hold senders, so the queue never closes here
                    let Some(text) = queued else { break };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                received = socket.recv() => {
                    match received {
                        Some(Ok(Message::Text(text))) => listener.on_message(&client, text.as_str()),
                        Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                            Ok(text) => listener.on_message(&client, text),
                            Err(_) => {
                                tracing::debug!(connection = %client.id, len = data.len(), "Dropping non-UTF-8 binary frame");
                            }
                        },
                        Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                        // Ping/pong are answered by the socket layer
                        Some(Ok(_)) => {}
                    }
                }
            }
        }

        self.remove(client.id);
        tracing::debug!(connection = %client.id, open = self.len(), "Socket connection removed");
        listener.on_close(&client);
    }
}

impl ClientRegistry for ConnectionSet {
    fn clients(&self) -> Vec<ClientHandle> {
        self.clients.read().unwrap().values().cloned().collect()
    }
}
