//! Configuration schema types for the duet broker.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults documented in the template.

mod limits;
mod logging;
mod room;
mod server;

pub use limits::*;
pub use logging::*;
pub use room::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct DuetConfig {
    pub server: ServerConfig,
    pub room: RoomConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
