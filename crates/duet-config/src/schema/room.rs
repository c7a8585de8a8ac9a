//! Room admission and departure policy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Reject a join whose origin address is already present in the room.
    pub dedupe_origins: bool,
    /// Send `call-ended` alongside `partner-left` when a peer departs.
    pub end_call_on_leave: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            dedupe_origins: false,
            end_call_on_leave: true,
        }
    }
}
