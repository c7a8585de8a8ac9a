//! Per-section validators.

use std::net::IpAddr;

use crate::schema::DuetConfig;

use super::helpers::validate_range;

/// Validate listener constraints.
pub(crate) fn validate_server(errors: &mut Vec<String>, config: &DuetConfig) {
    let server = &config.server;
    if server.bind.parse::<IpAddr>().is_err() {
        errors.push(format!("server.bind = {:?} is not an IP address", server.bind));
    }
    validate_range(errors, "server.port", server.port, 1, 65535);
    validate_range(errors, "server.ping_interval", server.ping_interval, 5, 300);
    validate_range(errors, "server.join_timeout", server.join_timeout, 0, 3600);
}

/// Validate payload bounds.
pub(crate) fn validate_limits(errors: &mut Vec<String>, config: &DuetConfig) {
    let limits = &config.limits;
    validate_range(errors, "limits.max_message_len", limits.max_message_len, 1, 100_000);
    validate_range(errors, "limits.max_name_len", limits.max_name_len, 1, 256);
    validate_range(errors, "limits.max_avatar_len", limits.max_avatar_len, 1, 1024);
    validate_range(errors, "limits.max_room_id_len", limits.max_room_id_len, 4, 256);
    validate_range(
        errors,
        "limits.max_frame_bytes",
        limits.max_frame_bytes,
        1024,
        16 * 1024 * 1024,
    );
    validate_range(errors, "limits.outbound_queue", limits.outbound_queue, 8, 65536);

    // A frame must be able to carry a maximal chat message (4 bytes per char worst case).
    if limits.max_frame_bytes < limits.max_message_len.saturating_mul(4) {
        errors.push(format!(
            "limits.max_frame_bytes = {} cannot carry limits.max_message_len = {}",
            limits.max_frame_bytes, limits.max_message_len
        ));
    }
}
