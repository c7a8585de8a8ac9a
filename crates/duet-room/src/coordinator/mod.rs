//! The room/session coordinator.
//!
//! Ties the connection registry and room directory together. The join,
//! relay, and leave protocols live in `admission`, `relay`, and
//! `departure`; this module owns the shared state, the policy, and the
//! dispatch from parsed client events.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use duet_common::{new_room_id, ConnectionId, RoomId};
use tracing::{debug, warn};

use crate::directory::RoomDirectory;
use crate::playback::PlaybackState;
use crate::protocol::{ClientEvent, Command, Delivery, JoinRequest, ServerEvent};
use crate::registry::{ConnectionRegistry, Session};

/// Source of "now" for playback timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Upper bounds on client-supplied text, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLimits {
    pub max_message_len: usize,
    pub max_name_len: usize,
    pub max_avatar_len: usize,
    pub max_room_id_len: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_message_len: 2000,
            max_name_len: 40,
            max_avatar_len: 64,
            max_room_id_len: 64,
        }
    }
}

/// Deployment-level admission and departure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPolicy {
    /// Reject joins from an origin address already present in the room.
    pub dedupe_origins: bool,
    /// Follow `partner-left` with `call-ended` for the remaining occupant.
    pub end_call_on_leave: bool,
    pub limits: PayloadLimits,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            dedupe_origins: false,
            end_call_on_leave: true,
            limits: PayloadLimits::default(),
        }
    }
}

/// Point-in-time counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub rooms: usize,
    pub sessions: usize,
}

/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Coordinator {
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) directory: Arc<RoomDirectory>,
    pub(crate) policy: Arc<RoomPolicy>,
    clock: Clock,
}

impl Coordinator {
    pub fn new(policy: RoomPolicy) -> Self {
        let clock: Clock = Arc::new(Utc::now);
        Self::with_clock(policy, clock)
    }

    pub fn with_clock(policy: RoomPolicy, clock: Clock) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            directory: Arc::new(RoomDirectory::new()),
            policy: Arc::new(policy),
            clock,
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub async fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            rooms: self.directory.len().await,
            sessions: self.registry.len().await,
        }
    }

    pub async fn session(&self, conn_id: &ConnectionId) -> Option<Session> {
        self.registry.get(conn_id).await
    }

    /// Members of a room in join order, or `None` if the room does not exist.
    pub async fn room_members(&self, room_id: &RoomId) -> Option<Vec<ConnectionId>> {
        let handle = self.directory.get(room_id).await?;
        let room = handle.lock().await;
        Some(room.members().to_vec())
    }

    pub async fn playback(&self, room_id: &RoomId) -> Option<PlaybackState> {
        let handle = self.directory.get(room_id).await?;
        let room = handle.lock().await;
        Some(room.playback.clone())
    }

    /// Handle one parsed client event and return what must be delivered.
    ///
    /// Join failures and loud relay failures come back as a single message
    /// to the sender. Silent relay failures yield nothing.
    pub async fn dispatch(
        &self,
        conn_id: &ConnectionId,
        origin: &str,
        event: ClientEvent,
    ) -> Vec<Delivery> {
        match Command::from(event) {
            Command::CreateRoom => {
                let room_id = new_room_id();
                debug!(conn = %conn_id, room = %room_id, "Allocated room id");
                vec![Delivery::new(
                    conn_id.clone(),
                    ServerEvent::RoomCreated {
                        link: format!("/room/{room_id}"),
                        room_id,
                    },
                )]
            }
            Command::Join {
                room_id,
                display_name,
                avatar,
            } => {
                let request = JoinRequest {
                    room_id,
                    display_name,
                    avatar,
                    origin: origin.to_string(),
                };
                match self.join(conn_id, request).await {
                    Ok(deliveries) => deliveries,
                    Err(e) => {
                        warn!(conn = %conn_id, origin, error = %e, "Join rejected");
                        vec![Delivery::new(conn_id.clone(), e.to_event())]
                    }
                }
            }
            Command::Relay(event) => match self.relay(conn_id, event).await {
                Ok(deliveries) => deliveries,
                Err(e) if e.is_silent() => {
                    debug!(conn = %conn_id, error = %e, "Relay dropped");
                    Vec::new()
                }
                Err(e) => {
                    warn!(conn = %conn_id, error = %e, "Relay refused");
                    vec![Delivery::new(
                        conn_id.clone(),
                        ServerEvent::Error {
                            message: e.to_string(),
                        },
                    )]
                }
            },
            Command::Leave => self.leave(conn_id).await,
        }
    }
}
