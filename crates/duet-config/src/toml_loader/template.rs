//! Default TOML config template with inline documentation comments.

use crate::schema::CONFIG_SCHEMA_VERSION;

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    format!("# duet Configuration\n# Schema version {CONFIG_SCHEMA_VERSION}\n{SECTIONS}")
}

const SECTIONS: &str = r##"# Only override what you want to change -- missing fields use defaults.

[server]
# bind = "0.0.0.0"
# port = 3000                  # 1-65535
# ping_interval = 30           # seconds, 5-300
# join_timeout = 0             # seconds an unjoined connection may idle, 0 = never
# trust_forwarded_for = false  # take origin address from X-Forwarded-For

[room]
# dedupe_origins = false       # reject a second join from an origin already in the room
# end_call_on_leave = true     # send call-ended to the remaining peer on departure

[limits]
# max_message_len = 2000       # characters, 1-100000
# max_name_len = 40            # characters, 1-256
# max_avatar_len = 64          # characters, 1-1024
# max_room_id_len = 64         # characters, 4-256
# max_frame_bytes = 65536      # bytes, 1024-16777216
# outbound_queue = 256         # messages per connection, 8-65536

[logging]
# level = "INFO"               # DEBUG, INFO, WARNING, ERROR
"##;
