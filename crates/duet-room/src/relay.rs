//! Event relay: forwards a sender's event to the other occupant.
//!
//! Nothing is ever echoed back to the sender. The only state touched is
//! the room's playback record.

use duet_common::ConnectionId;
use serde_json::Value;
use tracing::debug;

use crate::coordinator::Coordinator;
use crate::error::RelayError;
use crate::playback::PlaybackControl;
use crate::protocol::{Delivery, ServerEvent};
use crate::registry::Session;

/// Events relayed between occupants.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Message {
        message: String,
        timestamp: Value,
        msg_id: String,
    },
    Typing {
        is_typing: bool,
    },
    /// Delivery receipt for `msg_id`.
    Seen {
        msg_id: String,
    },
    Playback(PlaybackControl),
    Call(CallSignal),
}

/// WebRTC call negotiation. Payloads are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum CallSignal {
    Request,
    Cancelled,
    Accepted,
    Rejected,
    Ended,
    VideoOffer { offer: Value },
    VideoAnswer { answer: Value },
    IceCandidate { candidate: Value },
    ToggleVideo { enabled: bool },
    ToggleAudio { enabled: bool },
}

impl RelayEvent {
    /// Wire name of the event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::Message { .. } => "send-message",
            RelayEvent::Typing { .. } => "typing",
            RelayEvent::Seen { .. } => "message-seen",
            RelayEvent::Playback(_) => "music-control",
            RelayEvent::Call(signal) => match signal {
                CallSignal::Request => "call-request",
                CallSignal::Cancelled => "call-cancelled",
                CallSignal::Accepted => "call-accepted",
                CallSignal::Rejected => "call-rejected",
                CallSignal::Ended => "call-ended",
                CallSignal::VideoOffer { .. } => "video-offer",
                CallSignal::VideoAnswer { .. } => "video-answer",
                CallSignal::IceCandidate { .. } => "ice-candidate",
                CallSignal::ToggleVideo { .. } => "toggle-video",
                CallSignal::ToggleAudio { .. } => "toggle-audio",
            },
        }
    }
}

impl Coordinator {
    /// Forward `event` from `sender` to the rest of its room.
    ///
    /// Fails with `Unsessioned` if the sender has not joined and
    /// `UnknownRoom` if its room is gone; callers drop both silently.
    pub async fn relay(
        &self,
        sender: &ConnectionId,
        event: RelayEvent,
    ) -> Result<Vec<Delivery>, RelayError> {
        self.check_relay_payload(&event)?;

        let session = self
            .registry
            .get(sender)
            .await
            .ok_or(RelayError::Unsessioned)?;
        let handle = self
            .directory
            .get(&session.room_id)
            .await
            .ok_or_else(|| RelayError::UnknownRoom(session.room_id.clone()))?;

        let mut room = handle.lock().await;
        if room.is_retired() || !room.contains(sender) {
            return Err(RelayError::UnknownRoom(session.room_id.clone()));
        }

        let kind = event.kind();
        let outbound = match event {
            RelayEvent::Message {
                message,
                timestamp,
                msg_id,
            } => ServerEvent::ReceiveMessage {
                from: session.display_name.clone(),
                avatar: session.avatar.clone(),
                message,
                timestamp,
                msg_id,
                socket_id: sender.clone(),
            },
            RelayEvent::Typing { is_typing } => ServerEvent::PartnerTyping {
                is_typing,
                name: session.display_name.clone(),
            },
            RelayEvent::Seen { msg_id } => ServerEvent::MessageSeen { msg_id },
            RelayEvent::Playback(control) => {
                let now = self.now();
                room.playback.apply(control, now);
                ServerEvent::MusicSync(room.playback.snapshot(None))
            }
            RelayEvent::Call(signal) => call_event(&session, signal),
        };

        let out: Vec<Delivery> = room
            .others(sender)
            .map(|peer| Delivery::new(peer.clone(), outbound.clone()))
            .collect();

        debug!(room = %room.id, conn = %sender, kind, peers = out.len(), "Relayed event");
        Ok(out)
    }

    fn check_relay_payload(&self, event: &RelayEvent) -> Result<(), RelayError> {
        match event {
            RelayEvent::Message { message, .. } => {
                let limit = self.policy.limits.max_message_len;
                if message.chars().count() > limit {
                    return Err(RelayError::PayloadTooLarge {
                        field: "message",
                        limit,
                    });
                }
            }
            RelayEvent::Playback(control) if !control.is_valid() => {
                return Err(RelayError::InvalidPlayback(control.position));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Annotate a call signal with the sender identity where the peer needs it.
fn call_event(session: &Session, signal: CallSignal) -> ServerEvent {
    match signal {
        CallSignal::Request => ServerEvent::CallRequest {
            from: session.conn_id.clone(),
            name: session.display_name.clone(),
            avatar: session.avatar.clone(),
        },
        CallSignal::Cancelled => ServerEvent::CallCancelled,
        CallSignal::Accepted => ServerEvent::CallAccepted,
        CallSignal::Rejected => ServerEvent::CallRejected,
        CallSignal::Ended => ServerEvent::CallEnded,
        CallSignal::VideoOffer { offer } => ServerEvent::VideoOffer {
            from: session.conn_id.clone(),
            offer,
        },
        CallSignal::VideoAnswer { answer } => ServerEvent::VideoAnswer {
            from: session.conn_id.clone(),
            answer,
        },
        CallSignal::IceCandidate { candidate } => ServerEvent::IceCandidate { candidate },
        CallSignal::ToggleVideo { enabled } => ServerEvent::ToggleVideo { enabled },
        CallSignal::ToggleAudio { enabled } => ServerEvent::ToggleAudio { enabled },
    }
}
