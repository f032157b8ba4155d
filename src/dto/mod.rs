use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Health payload.
pub mod health;
/// Final results views.
pub mod results;
/// Session requests, views and action responses.
pub mod session;
/// SSE payloads.
pub mod sse;
/// Field validators shared by request DTOs.
pub mod validation;

/// RFC 3339 rendering used in every view timestamp.
fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
