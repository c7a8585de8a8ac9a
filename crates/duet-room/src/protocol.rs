//! Wire protocol for the duet broker.
//!
//! Every frame is a JSON object tagged by `type` with kebab-case event
//! names and camelCase fields, e.g.
//! `{"type":"send-message","message":"hi","msgId":"m1"}`.
//! Unknown fields are ignored so older clients that still send a
//! `roomId` on every event keep working.

use duet_common::{ConnectionId, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::playback::{PlaybackControl, PlaybackSnapshot};
use crate::relay::{CallSignal, RelayEvent};

// ---------------------------------------------------------------------------
// Client -> broker
// ---------------------------------------------------------------------------

/// Events a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Ask the broker to allocate a fresh room id. Creates no state.
    CreateRoom,

    JoinRoom {
        room_id: RoomId,
        user_name: String,
        #[serde(default)]
        avatar: String,
    },

    SendMessage {
        message: String,
        #[serde(default)]
        timestamp: Value,
        msg_id: String,
    },

    Typing {
        is_typing: bool,
    },

    MessageSeen {
        msg_id: String,
    },

    MusicControl {
        track_index: u32,
        playing: bool,
        position: f64,
    },

    CallRequest,
    CallCancelled,
    CallAccepted,
    CallRejected,
    CallEnded,

    VideoOffer {
        offer: Value,
    },

    VideoAnswer {
        answer: Value,
    },

    IceCandidate {
        candidate: Value,
    },

    ToggleVideo {
        enabled: bool,
    },

    ToggleAudio {
        enabled: bool,
    },

    /// Explicit departure without closing the socket.
    Leaving,
}

/// Parameters of a join request.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    pub room_id: RoomId,
    pub display_name: String,
    pub avatar: String,
    pub origin: String,
}

/// What the coordinator should do with a parsed client event.
#[derive(Debug, Clone)]
pub enum Command {
    CreateRoom,
    Join {
        room_id: RoomId,
        display_name: String,
        avatar: String,
    },
    Relay(RelayEvent),
    Leave,
}

impl From<ClientEvent> for Command {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::CreateRoom => Command::CreateRoom,
            ClientEvent::JoinRoom {
                room_id,
                user_name,
                avatar,
            } => Command::Join {
                room_id,
                display_name: user_name,
                avatar,
            },
            ClientEvent::SendMessage {
                message,
                timestamp,
                msg_id,
            } => Command::Relay(RelayEvent::Message {
                message,
                timestamp,
                msg_id,
            }),
            ClientEvent::Typing { is_typing } => Command::Relay(RelayEvent::Typing { is_typing }),
            ClientEvent::MessageSeen { msg_id } => Command::Relay(RelayEvent::Seen { msg_id }),
            ClientEvent::MusicControl {
                track_index,
                playing,
                position,
            } => Command::Relay(RelayEvent::Playback(PlaybackControl {
                track_index,
                playing,
                position,
            })),
            ClientEvent::CallRequest => Command::Relay(RelayEvent::Call(CallSignal::Request)),
            ClientEvent::CallCancelled => Command::Relay(RelayEvent::Call(CallSignal::Cancelled)),
            ClientEvent::CallAccepted => Command::Relay(RelayEvent::Call(CallSignal::Accepted)),
            ClientEvent::CallRejected => Command::Relay(RelayEvent::Call(CallSignal::Rejected)),
            ClientEvent::CallEnded => Command::Relay(RelayEvent::Call(CallSignal::Ended)),
            ClientEvent::VideoOffer { offer } => {
                Command::Relay(RelayEvent::Call(CallSignal::VideoOffer { offer }))
            }
            ClientEvent::VideoAnswer { answer } => {
                Command::Relay(RelayEvent::Call(CallSignal::VideoAnswer { answer }))
            }
            ClientEvent::IceCandidate { candidate } => {
                Command::Relay(RelayEvent::Call(CallSignal::IceCandidate { candidate }))
            }
            ClientEvent::ToggleVideo { enabled } => {
                Command::Relay(RelayEvent::Call(CallSignal::ToggleVideo { enabled }))
            }
            ClientEvent::ToggleAudio { enabled } => {
                Command::Relay(RelayEvent::Call(CallSignal::ToggleAudio { enabled }))
            }
            ClientEvent::Leaving => Command::Leave,
        }
    }
}

// ---------------------------------------------------------------------------
// Broker -> client
// ---------------------------------------------------------------------------

/// Events the broker sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    RoomCreated {
        room_id: String,
        link: String,
    },

    JoinedRoom {
        room_id: RoomId,
        user_count: usize,
        is_alone: bool,
        music_state: PlaybackSnapshot,
    },

    PartnerJoined {
        name: String,
        avatar: String,
        user_count: usize,
    },

    PartnerAlreadyHere {
        name: String,
        avatar: String,
    },

    RoomFull,

    OriginAlreadyConnected,

    ReceiveMessage {
        from: String,
        avatar: String,
        message: String,
        timestamp: Value,
        msg_id: String,
        socket_id: ConnectionId,
    },

    PartnerTyping {
        is_typing: bool,
        name: String,
    },

    MessageSeen {
        msg_id: String,
    },

    MusicSync(PlaybackSnapshot),

    CallRequest {
        from: ConnectionId,
        name: String,
        avatar: String,
    },

    CallCancelled,
    CallAccepted,
    CallRejected,
    CallEnded,

    VideoOffer {
        from: ConnectionId,
        offer: Value,
    },

    VideoAnswer {
        from: ConnectionId,
        answer: Value,
    },

    IceCandidate {
        candidate: Value,
    },

    ToggleVideo {
        enabled: bool,
    },

    ToggleAudio {
        enabled: bool,
    },

    PartnerLeft {
        name: String,
    },

    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!("{{\"type\":\"error\",\"message\":\"failed to encode event: {e}\"}}")
        })
    }
}

/// One outbound message addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}
