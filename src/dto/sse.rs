use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::GameStatus;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name.
    pub event: Option<String>,
    /// SSE data field.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever a session moves to another status.
pub struct StatusChangedEvent {
    /// Previous status.
    pub from: GameStatus,
    /// New status.
    pub to: GameStatus,
    /// Current question index after the change.
    pub current_question_index: usize,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Severity of a notice.
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something players should know about.
    Warning,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Human-readable message pushed to every player of a session.
pub struct NoticeEvent {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether storage is unavailable.
    pub degraded: bool,
}
