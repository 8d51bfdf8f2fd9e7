//! Data transfer objects for the HTTP and WebSocket surfaces.

use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod admin;
pub mod contest;
pub mod events;
pub mod health;
pub mod validation;

/// Render an instant as RFC 3339 for the wire.
pub fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
