//! Server-owned round timers: one pending task per session closes the open round when it elapses.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::session_service,
    state::{SharedState, state_machine::ActionError},
};

struct ArmedTimer {
    id: u64,
    question_index: usize,
    handle: AbortHandle,
}

/// Registry of armed timers keyed by session code.
#[derive(Default)]
pub struct RoundTimers {
    armed: DashMap<String, ArmedTimer>,
    next_id: AtomicU64,
}

impl RoundTimers {
    /// Abort the timer of a session, if any.
    pub fn cancel(&self, code: &str) {
        if let Some((_, timer)) = self.armed.remove(code) {
            timer.handle.abort();
            debug!(code, question_index = timer.question_index, "round timer cancelled");
        }
    }

    /// Round the session's armed timer will close, if any.
    pub fn armed_round(&self, code: &str) -> Option<usize> {
        self.armed.get(code).map(|timer| timer.question_index)
    }

    fn arm(&self, code: &str, id: u64, question_index: usize, handle: AbortHandle) {
        let previous = self.armed.insert(
            code.to_owned(),
            ArmedTimer {
                id,
                question_index,
                handle,
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
        }
    }

    /// Unregister a firing timer; `false` when it was superseded meanwhile.
    fn release(&self, code: &str, id: u64) -> bool {
        self.armed.remove_if(code, |_, timer| timer.id == id).is_some()
    }
}

/// Arm the timer closing round `question_index` of `code` after `after`, replacing any
/// previously armed timer of that session.
pub fn schedule(state: &SharedState, code: &str, question_index: usize, after: Duration) {
    let timers = state.round_timers();
    let id = timers.next_id.fetch_add(1, Ordering::Relaxed);

    let task_state = state.clone();
    let task_code = code.to_owned();
    let task = tokio::spawn(async move {
        tokio::time::sleep(after).await;
        if !task_state.round_timers().release(&task_code, id) {
            return;
        }

        match session_service::close_round_on_timer(&task_state, &task_code, question_index).await
        {
            Ok(_) => info!(code = %task_code, question_index, "round closed by timer"),
            Err(ServiceError::Rejected(
                err @ (ActionError::StaleRound { .. } | ActionError::InvalidTransition(_)),
            )) => debug!(code = %task_code, question_index, error = %err, "round timer no longer relevant"),
            Err(err) => warn!(code = %task_code, question_index, error = %err, "round timer failed to close round"),
        }
    });

    timers.arm(code, id, question_index, task.abort_handle());
    debug!(code, question_index, seconds = after.as_secs(), "round timer armed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rearming_aborts_the_previous_timer() {
        let timers = RoundTimers::default();
        let first = tokio::spawn(std::future::pending::<()>());
        let second = tokio::spawn(std::future::pending::<()>());

        timers.arm("ABCD", 1, 0, first.abort_handle());
        timers.arm("ABCD", 2, 1, second.abort_handle());
        assert_eq!(timers.armed_round("ABCD"), Some(1));
        assert!(first.await.unwrap_err().is_cancelled());

        assert!(!timers.release("ABCD", 1));
        assert!(timers.release("ABCD", 2));
        assert_eq!(timers.armed_round("ABCD"), None);
        second.abort();
    }

    #[tokio::test]
    async fn cancel_aborts_the_task() {
        let timers = RoundTimers::default();
        let task = tokio::spawn(std::future::pending::<()>());
        timers.arm("ABCD", 1, 0, task.abort_handle());

        timers.cancel("ABCD");
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(timers.armed_round("ABCD"), None);
    }
}
