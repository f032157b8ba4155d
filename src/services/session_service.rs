//! Session lifecycle: every mutation goes through here, under the session gate and a
//! revision-checked write.

use std::{sync::Arc, time::{Duration, SystemTime}};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::QuestionSource,
    dao::{models::SessionEntity, session_store::SessionStore, storage::StorageError},
    dto::{
        results::ResultsResponse,
        session::{
            ActionResponse, CreateSessionRequest, JoinResponse, JoinSessionRequest, PlayerView,
            PlayerIdentityResponse, SessionListItem, SessionView, VoteRequest,
        },
        sse::NoticeLevel,
    },
    error::ServiceError,
    questions::{
        bank::QuestionSeed,
        generator::{GenerateQuestionsRequest, generate_or_fallback},
    },
    services::{round_timer, session_code, sse_events},
    state::{
        SharedState, scoring,
        session::GameSession,
        state_machine::{self, ActionOutcome, Actor, GameStatus, SessionAction, SessionEvent},
    },
};

/// Attempts at a read-reduce-write cycle before giving up on a contended session.
const MAX_WRITE_ATTEMPTS: usize = 3;
/// Attempts at drawing a free session code.
const MAX_CODE_ATTEMPTS: usize = 16;

struct Applied {
    session: GameSession,
    outcome: ActionOutcome,
}

/// Open a new lobby.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionView, ServiceError> {
    let config = state.config();
    if !(1..=config.max_rounds).contains(&request.num_rounds) {
        return Err(ServiceError::InvalidInput(format!(
            "between 1 and {} rounds can be played",
            config.max_rounds
        )));
    }
    let timer_duration = request
        .timer_duration
        .unwrap_or_else(|| u32::try_from(config.default_timer.as_secs()).unwrap_or(u32::MAX));

    let store = state.require_session_store().await?;
    let new_session =
        |code: String| GameSession::new(code, request.difficulty, request.num_rounds, timer_duration);

    let saved = match request.code.as_deref() {
        Some(code) => {
            let code = session_code::normalize(code)?;
            store
                .save_session(new_session(code.clone()).into(), None)
                .await
                .map_err(|err| match err {
                    StorageError::Conflict { .. } => {
                        ServiceError::Conflict(format!("session code `{code}` is already in use"))
                    }
                    other => other.into(),
                })?
        }
        None => insert_with_generated_code(store.as_ref(), config.session_code_length, new_session)
            .await?,
    };

    let session: GameSession = saved.into();
    info!(
        code = %session.id,
        difficulty = session.difficulty.as_str(),
        num_rounds = session.num_rounds,
        "session created"
    );
    Ok(SessionView::from(&session))
}

async fn insert_with_generated_code(
    store: &dyn SessionStore,
    length: usize,
    new_session: impl Fn(String) -> GameSession,
) -> Result<SessionEntity, ServiceError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = {
            let mut rng = rand::rng();
            session_code::generate(length, &mut rng)
        };
        match store.save_session(new_session(code.clone()).into(), None).await {
            Ok(saved) => return Ok(saved),
            Err(StorageError::Conflict { .. }) => {
                warn!(code = %code, "generated session code already in use; drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(ServiceError::Conflict(
        "could not find a free session code".into(),
    ))
}

/// Current state of a session.
pub async fn get_session(state: &SharedState, code: &str) -> Result<SessionView, ServiceError> {
    let session = read_session(state, code).await?;
    Ok(SessionView::from(&session))
}

/// Summaries of every stored session.
pub async fn list_sessions(state: &SharedState) -> Result<Vec<SessionListItem>, ServiceError> {
    let store = state.require_session_store().await?;
    let sessions = store.list_sessions().await?;
    Ok(sessions.into_iter().map(Into::into).collect())
}

/// Add a player to a lobby. The first player to join becomes the host.
pub async fn join(
    state: &SharedState,
    code: &str,
    request: JoinSessionRequest,
) -> Result<JoinResponse, ServiceError> {
    let player_id = request
        .player_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let name = request.name;

    let (session, _) = dispatch(state, code, |_| SessionAction::Join {
        player_id: player_id.clone(),
        name: name.clone(),
    })
    .await?;

    let player = session
        .player(&player_id)
        .map(PlayerView::from)
        .ok_or_else(|| ServiceError::InvalidState(format!("player `{player_id}` vanished")))?;
    info!(code = %session.id, player_id = %player.id, "player joined");

    Ok(JoinResponse {
        is_host: session.is_host(&player_id),
        identity_key: session_code::identity_key(&session.id),
        session: SessionView::from(&session),
        player,
    })
}

/// Re-identify a returning device.
pub async fn find_player(
    state: &SharedState,
    code: &str,
    player_id: &str,
) -> Result<PlayerIdentityResponse, ServiceError> {
    let session = read_session(state, code).await?;
    let player = session.player(player_id).ok_or_else(|| {
        ServiceError::NotFound(format!("player `{player_id}` is not part of session `{}`", session.id))
    })?;

    Ok(PlayerIdentityResponse {
        player: PlayerView::from(player),
        is_host: session.is_host(player_id),
    })
}

/// Draw the questions and open the first round. Host only.
pub async fn start(
    state: &SharedState,
    code: &str,
    player_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let session = read_session(state, code).await?;
    // Rejected starts never reach the generator. The reducer checks again under the gate.
    state_machine::check_start(&session, player_id, &state.config().rules())?;
    let pool = resolve_pool(state, &session).await;

    let caller = player_id.to_owned();
    let (_, response) = dispatch(state, code, |_| SessionAction::Start {
        caller: caller.clone(),
        pool: pool.clone(),
    })
    .await?;
    Ok(response)
}

/// Record or replace a vote on the current question.
pub async fn submit_vote(
    state: &SharedState,
    code: &str,
    request: VoteRequest,
) -> Result<ActionResponse, ServiceError> {
    let (_, response) = dispatch(state, code, |_| SessionAction::SubmitVote {
        voter: request.player_id.clone(),
        chosen: request.chosen_player_id.clone(),
    })
    .await?;
    Ok(response)
}

/// Close the open round early. Host only.
pub async fn close_round(
    state: &SharedState,
    code: &str,
    player_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let (_, response) = dispatch(state, code, |session| SessionAction::CloseRound {
        actor: Actor::Player(player_id.to_owned()),
        question_index: session.current_question_index,
    })
    .await?;
    Ok(response)
}

/// Close round `question_index` because its timer elapsed.
pub async fn close_round_on_timer(
    state: &SharedState,
    code: &str,
    question_index: usize,
) -> Result<ActionResponse, ServiceError> {
    let (_, response) = dispatch(state, code, |_| SessionAction::CloseRound {
        actor: Actor::Authority,
        question_index,
    })
    .await?;
    Ok(response)
}

/// Leave the round results screen. Host only.
pub async fn advance(
    state: &SharedState,
    code: &str,
    player_id: &str,
) -> Result<ActionResponse, ServiceError> {
    let (_, response) = dispatch(state, code, |_| SessionAction::Advance {
        caller: player_id.to_owned(),
    })
    .await?;
    Ok(response)
}

/// Back to the lobby with the same players.
pub async fn restart(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    let (_, response) = dispatch(state, code, |_| SessionAction::Restart).await?;
    Ok(response)
}

/// Final ranking, round winners and awards.
pub async fn results(state: &SharedState, code: &str) -> Result<ResultsResponse, ServiceError> {
    let session = read_session(state, code).await?;
    let results = scoring::results(&session)?;
    Ok(ResultsResponse::new(session.id, results))
}

/// Remove a session and release everything attached to it.
pub async fn delete_session(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    let code = session_code::normalize(code)?;
    let store = state.require_session_store().await?;
    let gate = state.session_gate(&code);
    let _guard = gate.lock().await;

    if !store.delete_session(&code).await? {
        state.discard_gate(&code, &gate);
        return Err(ServiceError::NotFound(format!("session `{code}` not found")));
    }

    sse_events::broadcast_notice(state, &code, NoticeLevel::Info, "This session was closed.");
    state.forget_session(&code);
    info!(code = %code, "session deleted");
    Ok(())
}

async fn read_session(state: &SharedState, code: &str) -> Result<GameSession, ServiceError> {
    let code = session_code::normalize(code)?;
    let store = state.require_session_store().await?;
    load_session(store.as_ref(), &code).await
}

async fn load_session(store: &dyn SessionStore, code: &str) -> Result<GameSession, ServiceError> {
    store
        .find_session(code)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{code}` not found")))
}

async fn resolve_pool(state: &SharedState, session: &GameSession) -> Vec<QuestionSeed> {
    let bank_pool = || state.config().question_bank.pool(session.difficulty).to_vec();

    match (state.config().question_source, state.generator()) {
        (QuestionSource::Bank, _) => bank_pool(),
        (QuestionSource::Generated, Some(generator)) => {
            let request = GenerateQuestionsRequest {
                player_names: session.players.iter().map(|p| p.name.clone()).collect(),
                num_questions: session.num_rounds as usize,
                difficulty: session.difficulty,
            };
            generate_or_fallback(generator.as_ref(), request).await
        }
        (QuestionSource::Generated, None) => {
            warn!(code = %session.id, "generated questions requested but no generator configured; using bank");
            bank_pool()
        }
    }
}

/// Run one action end to end and fan out the result while still holding the gate, so
/// subscribers see updates in revision order.
async fn dispatch<F>(
    state: &SharedState,
    code: &str,
    build: F,
) -> Result<(GameSession, ActionResponse), ServiceError>
where
    F: Fn(&GameSession) -> SessionAction,
{
    let code = session_code::normalize(code)?;
    let gate = state.session_gate(&code);
    let _guard = gate.lock().await;

    let Applied { session, outcome } = match apply(state, &code, build).await {
        Ok(applied) => applied,
        Err(err @ ServiceError::NotFound(_)) => {
            state.discard_gate(&code, &gate);
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    let notices = sse_events::notices_for(&outcome);
    for notice in &notices {
        warn!(code = %session.id, message = %notice.message, "action raised a warning");
    }
    if outcome.status_changed() {
        info!(
            code = %session.id,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            "session status changed"
        );
    }

    sse_events::broadcast_action(state, &session, &outcome, &notices);
    sync_round_timer(state, &session, &outcome);

    let response = ActionResponse {
        session: SessionView::from(&session),
        warnings: notices,
    };
    Ok((session, response))
}

/// Read, reduce and conditionally write, retrying when another writer got in first.
/// Callers hold the session gate.
async fn apply<F>(state: &SharedState, code: &str, build: F) -> Result<Applied, ServiceError>
where
    F: Fn(&GameSession) -> SessionAction,
{
    let store: Arc<dyn SessionStore> = state.require_session_store().await?;
    let rules = state.config().rules();

    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let mut session = load_session(store.as_ref(), code).await?;
        let expected = session.revision;
        let action = build(&session);

        let outcome = {
            let mut rng = rand::rng();
            state_machine::reduce(&mut session, action, &rules, &mut rng)?
        };
        session.updated_at = SystemTime::now();

        match store.save_session(session.into(), Some(expected)).await {
            Ok(saved) => {
                return Ok(Applied {
                    session: saved.into(),
                    outcome,
                });
            }
            Err(err @ StorageError::Conflict { .. }) => {
                warn!(code = %code, attempt, error = %err, "session changed concurrently; retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(format!(
        "session `{code}` kept changing, please retry"
    )))
}

fn sync_round_timer(state: &SharedState, session: &GameSession, outcome: &ActionOutcome) {
    if !state.config().server_round_timer {
        return;
    }

    if session.status != GameStatus::Playing {
        state.round_timers().cancel(&session.id);
        return;
    }

    let round_opened = outcome
        .events
        .iter()
        .any(|event| matches!(event, SessionEvent::Start | SessionEvent::NextQuestion));
    if round_opened && session.timer_duration > 0 {
        round_timer::schedule(
            state,
            &session.id,
            session.current_question_index,
            Duration::from_secs(session.timer_duration.into()),
        );
    }
}
