//! Join protocol: capacity and origin checks, then an all-or-nothing
//! update of the room and the registry.

use duet_common::ConnectionId;
use tracing::info;

use crate::coordinator::Coordinator;
use crate::directory::{Room, ROOM_CAPACITY};
use crate::error::JoinError;
use crate::protocol::{Delivery, JoinRequest, ServerEvent};
use crate::registry::Session;

impl Coordinator {
    /// Admit `conn_id` to `request.room_id`, creating the room on first join.
    ///
    /// On success returns `joined-room` for the joiner, `partner-joined` for
    /// every other occupant, and `partner-already-here` for the joiner when the
    /// room is now full. On failure nothing has changed.
    pub async fn join(
        &self,
        conn_id: &ConnectionId,
        request: JoinRequest,
    ) -> Result<Vec<Delivery>, JoinError> {
        self.check_join_payload(&request)?;

        if let Some(existing) = self.registry.get(conn_id).await {
            return Err(JoinError::AlreadyJoined(existing.room_id));
        }

        loop {
            let handle = self
                .directory
                .get_or_create(&request.room_id, self.now())
                .await;
            let mut room = handle.lock().await;

            // Emptied and removed by a concurrent leave while we waited.
            if room.is_retired() {
                continue;
            }

            let result = self.admit(conn_id, &request, &mut room).await;
            if room.is_empty() {
                self.directory.retire(&handle, &mut room).await;
            }
            return result;
        }
    }

    fn check_join_payload(&self, request: &JoinRequest) -> Result<(), JoinError> {
        let limits = &self.policy.limits;
        if request.room_id.is_empty() {
            return Err(JoinError::EmptyRoomId);
        }
        check_len("roomId", request.room_id.as_str(), limits.max_room_id_len)?;
        check_len("userName", &request.display_name, limits.max_name_len)?;
        check_len("avatar", &request.avatar, limits.max_avatar_len)?;
        Ok(())
    }

    /// Runs with the room locked. The session is claimed in the registry
    /// before the room changes, so a connection is never admitted twice.
    async fn admit(
        &self,
        conn_id: &ConnectionId,
        request: &JoinRequest,
        room: &mut Room,
    ) -> Result<Vec<Delivery>, JoinError> {
        if room.contains(conn_id) {
            return Err(JoinError::AlreadyJoined(room.id.clone()));
        }
        if self.policy.dedupe_origins && room.has_origin(&request.origin) {
            return Err(JoinError::OriginAlreadyPresent);
        }
        if room.is_full() {
            return Err(JoinError::RoomFull);
        }

        self.registry
            .try_insert(Session {
                conn_id: conn_id.clone(),
                display_name: request.display_name.clone(),
                avatar: request.avatar.clone(),
                room_id: request.room_id.clone(),
                origin: request.origin.clone(),
            })
            .await
            .map_err(JoinError::AlreadyJoined)?;

        let had_peer = !room.is_empty();
        room.admit(conn_id.clone(), &request.origin);

        let user_count = room.len();
        let now = self.now();
        let mut out = Vec::with_capacity(ROOM_CAPACITY + 1);

        out.push(Delivery::new(
            conn_id.clone(),
            ServerEvent::JoinedRoom {
                room_id: request.room_id.clone(),
                user_count,
                is_alone: user_count == 1,
                music_state: room.playback.snapshot(had_peer.then_some(now)),
            },
        ));

        for other in room.others(conn_id) {
            out.push(Delivery::new(
                other.clone(),
                ServerEvent::PartnerJoined {
                    name: request.display_name.clone(),
                    avatar: request.avatar.clone(),
                    user_count,
                },
            ));
        }

        if user_count == ROOM_CAPACITY {
            let partner_id = room.others(conn_id).next().cloned();
            if let Some(partner_id) = partner_id {
                if let Some(partner) = self.registry.get(&partner_id).await {
                    out.push(Delivery::new(
                        conn_id.clone(),
                        ServerEvent::PartnerAlreadyHere {
                            name: partner.display_name,
                            avatar: partner.avatar,
                        },
                    ));
                }
            }
        }

        info!(
            room = %room.id,
            conn = %conn_id,
            name = %request.display_name,
            users = user_count,
            "Participant joined ({user_count}/{ROOM_CAPACITY})"
        );
        Ok(out)
    }
}

fn check_len(field: &'static str, value: &str, limit: usize) -> Result<(), JoinError> {
    if value.chars().count() > limit {
        return Err(JoinError::PayloadTooLarge { field, limit });
    }
    Ok(())
}
