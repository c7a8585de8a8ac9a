//! Room directory: room id -> room state, one lock per room.
//!
//! Lock order is room, then directory. The directory lock is never held
//! while waiting on a room.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use duet_common::{ConnectionId, RoomId};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::playback::PlaybackState;

/// Maximum occupants per room.
pub const ROOM_CAPACITY: usize = 2;

/// A two-slot conversation.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    /// Occupants in join order.
    members: Vec<ConnectionId>,
    /// Distinct origin addresses present, with the number of members behind each.
    origins: HashMap<String, usize>,
    pub playback: PlaybackState,
    /// Set once the room has been removed from the directory.
    retired: bool,
}

impl Room {
    pub fn new(id: RoomId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            members: Vec::with_capacity(ROOM_CAPACITY),
            origins: HashMap::new(),
            playback: PlaybackState::new(now),
            retired: false,
        }
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= ROOM_CAPACITY
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn contains(&self, conn_id: &ConnectionId) -> bool {
        self.members.contains(conn_id)
    }

    pub fn has_origin(&self, origin: &str) -> bool {
        self.origins.contains_key(origin)
    }

    /// Distinct origin addresses currently present.
    #[cfg(test)]
    pub(crate) fn origins(&self) -> impl Iterator<Item = &str> {
        self.origins.keys().map(String::as_str)
    }

    /// Every member except `conn_id`, in join order.
    pub fn others<'a>(
        &'a self,
        conn_id: &'a ConnectionId,
    ) -> impl Iterator<Item = &'a ConnectionId> + 'a {
        self.members.iter().filter(move |m| *m != conn_id)
    }

    /// Append a member. Callers check capacity first.
    pub(crate) fn admit(&mut self, conn_id: ConnectionId, origin: &str) {
        debug_assert!(!self.is_full());
        self.members.push(conn_id);
        *self.origins.entry(origin.to_string()).or_insert(0) += 1;
    }

    /// Remove a member and release its origin. Returns false if absent.
    pub(crate) fn evict(&mut self, conn_id: &ConnectionId, origin: &str) -> bool {
        let Some(idx) = self.members.iter().position(|m| m == conn_id) else {
            return false;
        };
        self.members.remove(idx);
        if let Some(count) = self.origins.get_mut(origin) {
            *count -= 1;
            if *count == 0 {
                self.origins.remove(origin);
            }
        }
        true
    }
}

/// Shared handle to one room's state.
pub type RoomHandle = Arc<Mutex<Room>>;

/// Thread-safe room directory.
#[derive(Default)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the room for `room_id`, inserting a fresh one if absent.
    ///
    /// Lookup and insert happen under one write guard.
    pub async fn get_or_create(&self, room_id: &RoomId, now: DateTime<Utc>) -> RoomHandle {
        let mut map = self.rooms.write().await;
        map.entry(room_id.clone())
            .or_insert_with(|| {
                info!(room = %room_id, "Room created");
                Arc::new(Mutex::new(Room::new(room_id.clone(), now)))
            })
            .clone()
    }

    pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Retire an empty room and drop it from the directory.
    ///
    /// Must be called with `room` locked through `handle`. Only removes the
    /// entry if it still points at `handle`.
    pub(crate) async fn retire(&self, handle: &RoomHandle, room: &mut Room) {
        debug_assert!(room.is_empty());
        room.retired = true;
        let mut map = self.rooms.write().await;
        if map
            .get(&room.id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            map.remove(&room.id);
            info!(room = %room.id, "Room closed (empty)");
        }
    }

    /// Number of rooms.
    pub(crate) async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }
}
