//! Two-party room coordinator for the duet signaling broker.
//!
//! Tracks which connection sits in which room, enforces the two-seat
//! capacity (and optionally one seat per origin address), keeps each
//! room's shared playback position, and works out who receives what when
//! a participant joins, relays an event, or departs. The coordinator does
//! no I/O: every operation returns the [`Delivery`] list for the
//! transport to send.

mod admission;
pub mod coordinator;
mod departure;
pub mod directory;
pub mod error;
pub mod playback;
pub mod protocol;
pub mod registry;
pub mod relay;

pub use coordinator::{Clock, Coordinator, CoordinatorStats, PayloadLimits, RoomPolicy};
pub use directory::{Room, RoomDirectory, ROOM_CAPACITY};
pub use error::{JoinError, RelayError};
pub use playback::{PlaybackControl, PlaybackSnapshot, PlaybackState};
pub use protocol::{ClientEvent, Command, Delivery, JoinRequest, ServerEvent};
pub use registry::{ConnectionRegistry, Session};
pub use relay::{CallSignal, RelayEvent};
