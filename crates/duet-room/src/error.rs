use duet_common::RoomId;

use crate::protocol::ServerEvent;

/// Why a join was refused. No state is changed on any of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("room is full")]
    RoomFull,

    #[error("origin already connected to this room")]
    OriginAlreadyPresent,

    #[error("connection already joined room {0}")]
    AlreadyJoined(RoomId),

    #[error("room id must not be empty")]
    EmptyRoomId,

    #[error("{field} exceeds {limit} characters")]
    PayloadTooLarge { field: &'static str, limit: usize },
}

impl JoinError {
    /// The single message sent back to the requester.
    pub fn to_event(&self) -> ServerEvent {
        match self {
            JoinError::RoomFull => ServerEvent::RoomFull,
            JoinError::OriginAlreadyPresent => ServerEvent::OriginAlreadyConnected,
            other => ServerEvent::Error {
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RelayError {
    #[error("sender has no active session")]
    Unsessioned,

    #[error("room {0} does not exist")]
    UnknownRoom(RoomId),

    #[error("{field} exceeds {limit} characters")]
    PayloadTooLarge { field: &'static str, limit: usize },

    #[error("invalid playback position {0}")]
    InvalidPlayback(f64),
}

impl RelayError {
    /// Errors expected around join/leave races. Dropped without telling the sender.
    pub fn is_silent(&self) -> bool {
        matches!(self, RelayError::Unsessioned | RelayError::UnknownRoom(_))
    }
}
