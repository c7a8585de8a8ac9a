//! Runtime settings derived from the loaded config.

use std::time::Duration;

use duet_config::DuetConfig;
use duet_room::{PayloadLimits, RoomPolicy};

/// Per-connection transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub ping_interval: Duration,
    /// Drop connections that have not joined a room within this window.
    pub join_timeout: Option<Duration>,
    pub trust_forwarded_for: bool,
    pub max_frame_bytes: usize,
    pub outbound_queue: usize,
}

impl ConnectionSettings {
    pub fn from_config(config: &DuetConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.server.ping_interval.max(1) as u64),
            join_timeout: match config.server.join_timeout {
                0 => None,
                secs => Some(Duration::from_secs(secs as u64)),
            },
            trust_forwarded_for: config.server.trust_forwarded_for,
            max_frame_bytes: config.limits.max_frame_bytes as usize,
            outbound_queue: config.limits.outbound_queue.max(1) as usize,
        }
    }
}

/// Coordinator policy for the configured deployment.
pub fn room_policy(config: &DuetConfig) -> RoomPolicy {
    RoomPolicy {
        dedupe_origins: config.room.dedupe_origins,
        end_call_on_leave: config.room.end_call_on_leave,
        limits: PayloadLimits {
            max_message_len: config.limits.max_message_len as usize,
            max_name_len: config.limits.max_name_len as usize,
            max_avatar_len: config.limits.max_avatar_len as usize,
            max_room_id_len: config.limits.max_room_id_len as usize,
        },
    }
}
