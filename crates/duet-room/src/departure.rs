//! Departure: abrupt disconnect or explicit leave.

use duet_common::ConnectionId;
use tracing::{debug, info};

use crate::coordinator::Coordinator;
use crate::protocol::{Delivery, ServerEvent};

impl Coordinator {
    /// Remove `conn_id` from its room and the registry.
    ///
    /// The last member out closes the room. Otherwise the remaining
    /// occupant gets `partner-left`, plus `call-ended` when the policy asks
    /// for it. Unknown connections are a no-op, so calling this twice is safe.
    pub async fn leave(&self, conn_id: &ConnectionId) -> Vec<Delivery> {
        let Some(session) = self.registry.get(conn_id).await else {
            debug!(conn = %conn_id, "Leave for unsessioned connection");
            return Vec::new();
        };

        let Some(handle) = self.directory.get(&session.room_id).await else {
            self.registry.remove(conn_id).await;
            return Vec::new();
        };

        let mut room = handle.lock().await;
        let was_member = room.evict(conn_id, &session.origin);
        self.registry.remove(conn_id).await;
        if !was_member {
            return Vec::new();
        }

        info!(
            room = %room.id,
            conn = %conn_id,
            name = %session.display_name,
            remaining = room.len(),
            "Participant left"
        );

        if room.is_empty() {
            self.directory.retire(&handle, &mut room).await;
            return Vec::new();
        }

        let mut out = Vec::with_capacity(2);
        for peer in room.others(conn_id) {
            out.push(Delivery::new(
                peer.clone(),
                ServerEvent::PartnerLeft {
                    name: session.display_name.clone(),
                },
            ));
            if self.policy.end_call_on_leave {
                out.push(Delivery::new(peer.clone(), ServerEvent::CallEnded));
            }
        }
        out
    }
}
