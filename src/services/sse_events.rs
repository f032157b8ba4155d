use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        session::SessionView,
        sse::{NoticeEvent, NoticeLevel, ServerEvent, StatusChangedEvent, SystemStatus},
    },
    state::{
        SharedState,
        session::GameSession,
        state_machine::{ActionOutcome, ActionWarning},
    },
};

pub(crate) const EVENT_SESSION_UPDATED: &str = "session.updated";
const EVENT_STATUS_CHANGED: &str = "status.changed";
const EVENT_NOTICE: &str = "notice";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Human-readable notices for the warnings of an action.
pub fn notices_for(outcome: &ActionOutcome) -> Vec<NoticeEvent> {
    outcome
        .warnings
        .iter()
        .map(|warning| match warning {
            ActionWarning::PoolExhausted(exhausted) => NoticeEvent {
                level: NoticeLevel::Warning,
                message: format!(
                    "Only {} questions available for {} rounds; some questions will repeat.",
                    exhausted.available, exhausted.requested
                ),
            },
        })
        .collect()
}

/// Build the snapshot event sent to every subscriber after a change.
pub fn session_updated_event(session: &GameSession) -> Option<ServerEvent> {
    to_event(EVENT_SESSION_UPDATED, &SessionView::from(session))
}

/// Broadcast the full session state.
pub fn broadcast_session_updated(state: &SharedState, session: &GameSession) {
    if let Some(event) = session_updated_event(session) {
        state.sse().broadcast(&session.id, event);
    }
}

/// Broadcast everything an action changed: status change, notices, then the new snapshot.
pub fn broadcast_action(
    state: &SharedState,
    session: &GameSession,
    outcome: &ActionOutcome,
    notices: &[NoticeEvent],
) {
    if outcome.status_changed() {
        let payload = StatusChangedEvent {
            from: outcome.from,
            to: outcome.to,
            current_question_index: session.current_question_index,
        };
        send_session_event(state, &session.id, EVENT_STATUS_CHANGED, &payload);
    }
    for notice in notices {
        send_session_event(state, &session.id, EVENT_NOTICE, notice);
    }
    broadcast_session_updated(state, session);
}

/// Push a notice to every player of a session.
pub fn broadcast_notice(state: &SharedState, code: &str, level: NoticeLevel, message: &str) {
    let payload = NoticeEvent {
        level,
        message: message.to_owned(),
    };
    send_session_event(state, code, EVENT_NOTICE, &payload);
}

/// Tell every connected client whether storage is reachable.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    if let Some(event) = to_event(EVENT_SYSTEM_STATUS, &SystemStatus { degraded }) {
        state.sse().broadcast_all(event);
    }
}

fn send_session_event(state: &SharedState, code: &str, event: &str, payload: &impl Serialize) {
    if let Some(event) = to_event(event, payload) {
        state.sse().broadcast(code, event);
    }
}

fn to_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
