//! Outbound channels for live connections.

use std::collections::HashMap;
use std::sync::Arc;

use duet_common::ConnectionId;
use duet_room::Delivery;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Maps connection ids to the sender feeding that connection's socket.
#[derive(Clone, Default)]
pub struct PeerMap {
    peers: Arc<RwLock<HashMap<ConnectionId, mpsc::Sender<String>>>>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, conn_id: ConnectionId, tx: mpsc::Sender<String>) {
        self.peers.write().await.insert(conn_id, tx);
    }

    pub async fn unregister(&self, conn_id: &ConnectionId) {
        self.peers.write().await.remove(conn_id);
    }

    /// Queue each delivery on its target's channel.
    ///
    /// Best effort: a missing target or a full queue drops the message.
    pub async fn deliver(&self, deliveries: Vec<Delivery>) {
        if deliveries.is_empty() {
            return;
        }
        let peers = self.peers.read().await;
        for delivery in deliveries {
            let Some(tx) = peers.get(&delivery.to) else {
                debug!(conn = %delivery.to, "Delivery target gone");
                continue;
            };
            if let Err(e) = tx.try_send(delivery.event.to_json()) {
                warn!(conn = %delivery.to, error = %e, "Dropped outbound event");
            }
        }
    }

    /// Number of live connections.
    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }
}
