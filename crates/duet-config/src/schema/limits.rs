//! Payload size bounds.

use serde::{Deserialize, Serialize};

/// Upper bounds on client-supplied payloads.
///
/// Text lengths are counted in characters, frame size in bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_message_len: u32,
    pub max_name_len: u32,
    pub max_avatar_len: u32,
    pub max_room_id_len: u32,
    pub max_frame_bytes: u32,
    /// Outbound messages buffered per connection before delivery is dropped.
    pub outbound_queue: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_len: 2000,
            max_name_len: 40,
            max_avatar_len: 64,
            max_room_id_len: 64,
            max_frame_bytes: 65536,
            outbound_queue: 256,
        }
    }
}
