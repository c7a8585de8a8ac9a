//! Connection registry: connection id -> session attributes.

use std::collections::HashMap;

use duet_common::{ConnectionId, RoomId};
use tokio::sync::RwLock;

/// One joined participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub conn_id: ConnectionId,
    pub display_name: String,
    pub avatar: String,
    pub room_id: RoomId,
    /// Address used for duplicate-origin detection.
    pub origin: String,
}

/// Thread-safe session store.
///
/// Reads hand out clones so no guard outlives a call.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session unless the connection already has one.
    ///
    /// On conflict returns the room the existing session belongs to.
    pub async fn try_insert(&self, session: Session) -> Result<(), RoomId> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&session.conn_id) {
            return Err(existing.room_id.clone());
        }
        sessions.insert(session.conn_id.clone(), session);
        Ok(())
    }

    pub async fn get(&self, conn_id: &ConnectionId) -> Option<Session> {
        self.sessions.read().await.get(conn_id).cloned()
    }

    /// Remove and return a session.
    pub async fn remove(&self, conn_id: &ConnectionId) -> Option<Session> {
        self.sessions.write().await.remove(conn_id)
    }

    /// Number of active sessions.
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
