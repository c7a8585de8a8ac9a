pub mod errors;
pub mod id;

pub use errors::{ConfigError, DuetError};
pub use id::{new_room_id, ConnectionId, RoomId};

pub type Result<T> = std::result::Result<T, DuetError>;
