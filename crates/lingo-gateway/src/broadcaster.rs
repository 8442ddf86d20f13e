use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use lingo_types::events::GatewayEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Process-wide fan-out of gateway events.
///
/// Delivery is at-most-once: every connection subscribed at publish time gets
/// the event, nobody is acknowledged, and nothing is replayed for connections
/// that arrive later. Clients reconcile by re-fetching history on (re)connect.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    /// Every connected client receives every event
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Live connections: conn_id -> user_id
    connections: RwLock<HashMap<Uuid, Uuid>>,
}

/// Handle returned by [`Broadcaster::connect`]. Pass `conn_id` back to
/// [`Broadcaster::disconnect`] when the socket closes.
pub struct Subscription {
    pub conn_id: Uuid,
    pub events: broadcast::Receiver<GatewayEvent>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may fall behind before it
    /// starts skipping events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(BroadcasterInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a connection for `user_id` and subscribe it to events.
    pub async fn connect(&self, user_id: Uuid) -> Subscription {
        let conn_id = Uuid::new_v4();
        // Subscribe before registering so a connection never appears live
        // without a receiver behind it.
        let events = self.inner.broadcast_tx.subscribe();
        self.inner.connections.write().await.insert(conn_id, user_id);
        Subscription { conn_id, events }
    }

    /// Remove a connection from the registry. Unknown ids are ignored.
    pub async fn disconnect(&self, conn_id: Uuid) {
        self.inner.connections.write().await.remove(&conn_id);
    }

    /// Publish an event to every current subscriber and return how many
    /// received it. Zero subscribers is not an error.
    pub fn publish(&self, event: GatewayEvent) -> usize {
        let kind = event.kind();
        let delivered = self.inner.broadcast_tx.send(event).unwrap_or(0);
        debug!("Published {} event to {} subscribers", kind, delivered);
        delivered
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }

    /// Whether `user_id` has at least one live connection.
    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner
            .connections
            .read()
            .await
            .values()
            .any(|uid| *uid == user_id)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
