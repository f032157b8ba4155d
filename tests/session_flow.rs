use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::{FutureExt, future::BoxFuture};
use hot_seat_back::{
    config::{AppConfig, QuestionSource},
    dao::session_store::{InMemorySessionStore, SessionStore},
    dto::session::{CreateSessionRequest, JoinSessionRequest, VoteRequest},
    error::ServiceError,
    questions::generator::{
        GenerateQuestionsRequest, GenerateQuestionsResponse, GeneratorError, QuestionGenerator,
    },
    services::{session_service, sse_service},
    state::{
        AppState, SharedState,
        session::{Difficulty, GameSession},
        state_machine::{ActionError, GameStatus},
    },
};

async fn state_with(config: AppConfig) -> SharedState {
    let state = AppState::new(config);
    state
        .set_session_store(Arc::new(InMemorySessionStore::new()))
        .await;
    state
}

async fn state() -> SharedState {
    state_with(AppConfig {
        server_round_timer: false,
        ..AppConfig::default()
    })
    .await
}

fn create(num_rounds: u32) -> CreateSessionRequest {
    CreateSessionRequest {
        difficulty: Difficulty::FamilyFriendly,
        num_rounds,
        timer_duration: None,
        code: None,
    }
}

fn join_as(name: &str, player_id: &str) -> JoinSessionRequest {
    JoinSessionRequest {
        name: name.into(),
        player_id: Some(player_id.into()),
    }
}

fn vote(voter: &str, chosen: &str) -> VoteRequest {
    VoteRequest {
        player_id: voter.into(),
        chosen_player_id: chosen.into(),
    }
}

/// Create a session with `ann` (host) and `bob` in it.
async fn lobby(state: &SharedState, num_rounds: u32) -> String {
    let session = session_service::create_session(state, create(num_rounds))
        .await
        .unwrap();
    session_service::join(state, &session.id, join_as("Ann", "ann"))
        .await
        .unwrap();
    session_service::join(state, &session.id, join_as("Bob", "bob"))
        .await
        .unwrap();
    session.id
}

#[tokio::test]
async fn full_game_reaches_results_and_restarts() {
    let state = state().await;
    let code = lobby(&state, 2).await;

    let started = session_service::start(&state, &code, "ann").await.unwrap();
    assert_eq!(started.session.status, GameStatus::Playing);
    assert_eq!(started.session.question_count, 2);
    assert!(started.warnings.is_empty());

    for _ in 0..2 {
        session_service::submit_vote(&state, &code, vote("ann", "bob"))
            .await
            .unwrap();
        let closed = session_service::submit_vote(&state, &code, vote("bob", "bob"))
            .await
            .unwrap();
        assert_eq!(closed.session.status, GameStatus::RoundResults);
        session_service::advance(&state, &code, "ann").await.unwrap();
    }

    let finished = session_service::get_session(&state, &code).await.unwrap();
    assert_eq!(finished.status, GameStatus::Results);

    let results = session_service::results(&state, &code).await.unwrap();
    assert_eq!(results.ranking[0].player_id, "bob");
    assert_eq!(results.ranking[0].score, 4);
    assert_eq!(results.runner_up.as_ref().map(|s| s.score), Some(0));
    assert_eq!(results.total_votes, 4);
    assert_eq!(results.rounds.len(), 2);
    assert!(results.rounds.iter().all(|round| round.winners == ["bob"]));

    let restarted = session_service::restart(&state, &code).await.unwrap();
    assert_eq!(restarted.session.status, GameStatus::Lobby);
    assert_eq!(restarted.session.players.len(), 2);
    assert!(restarted.session.players.iter().all(|p| p.score == 0));
    assert_eq!(restarted.session.question_count, 0);
}

#[tokio::test]
async fn join_assigns_host_and_identity_key() {
    let state = state().await;
    let session = session_service::create_session(&state, create(3))
        .await
        .unwrap();

    let host = session_service::join(
        &state,
        &session.id.to_lowercase(),
        JoinSessionRequest {
            name: "Ann".into(),
            player_id: None,
        },
    )
    .await
    .unwrap();
    assert!(host.is_host);
    assert_eq!(host.identity_key, format!("hotseat-player-{}", session.id));
    assert_eq!(host.session.host_id.as_deref(), Some(host.player.id.as_str()));

    let guest = session_service::join(&state, &session.id, join_as("Bob", "bob"))
        .await
        .unwrap();
    assert!(!guest.is_host);

    let duplicate = session_service::join(&state, &session.id, join_as(" ann ", "other"))
        .await
        .unwrap_err();
    assert!(matches!(
        duplicate,
        ServiceError::Rejected(ActionError::DuplicateName { .. })
    ));

    let found = session_service::find_player(&state, &session.id, "bob")
        .await
        .unwrap();
    assert_eq!(found.player.name, "Bob");
    assert!(!found.is_host);

    let missing = session_service::find_player(&state, &session.id, "nobody")
        .await
        .unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn only_the_host_starts_with_enough_players() {
    let state = state().await;
    let session = session_service::create_session(&state, create(1))
        .await
        .unwrap();
    session_service::join(&state, &session.id, join_as("Ann", "ann"))
        .await
        .unwrap();

    let lonely = session_service::start(&state, &session.id, "ann")
        .await
        .unwrap_err();
    assert!(matches!(
        lonely,
        ServiceError::Rejected(ActionError::NotEnoughPlayers { .. })
    ));

    session_service::join(&state, &session.id, join_as("Bob", "bob"))
        .await
        .unwrap();
    let not_host = session_service::start(&state, &session.id, "bob")
        .await
        .unwrap_err();
    assert!(matches!(
        not_host,
        ServiceError::Rejected(ActionError::NotHost { .. })
    ));

    let late = session_service::start(&state, &session.id, "ann").await.unwrap();
    assert_eq!(late.session.status, GameStatus::Playing);

    let too_late = session_service::join(&state, &session.id, join_as("Cat", "cat"))
        .await
        .unwrap_err();
    assert!(matches!(
        too_late,
        ServiceError::Rejected(ActionError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn oversized_games_warn_about_repeats() {
    let state = state().await;
    let code = lobby(&state, 20).await;

    let started = session_service::start(&state, &code, "ann").await.unwrap();
    assert_eq!(started.session.question_count, 20);
    assert_eq!(started.warnings.len(), 1);
}

#[tokio::test]
async fn subscribers_see_status_changes_then_snapshots() {
    let state = state().await;
    let code = lobby(&state, 1).await;
    let mut events = state.sse().subscribe(&code);

    session_service::start(&state, &code, "ann").await.unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first.event.as_deref(), Some("status.changed"));
    assert!(first.data.contains("\"to\":\"playing\""));

    let second = events.recv().await.unwrap();
    assert_eq!(second.event.as_deref(), Some("session.updated"));
    assert!(second.data.contains("\"status\":\"playing\""));
}

#[tokio::test]
async fn concurrent_votes_are_all_recorded() {
    let state = state_with(AppConfig {
        server_round_timer: false,
        show_round_results: true,
        ..AppConfig::default()
    })
    .await;
    let session = session_service::create_session(&state, create(1))
        .await
        .unwrap();
    let ids = ["p1", "p2", "p3", "p4", "p5"];
    for id in ids {
        session_service::join(&state, &session.id, join_as(id, id))
            .await
            .unwrap();
    }
    session_service::start(&state, &session.id, "p1").await.unwrap();

    let mut tasks = Vec::new();
    for id in ids {
        let state = state.clone();
        let code = session.id.clone();
        tasks.push(tokio::spawn(async move {
            session_service::submit_vote(&state, &code, vote(id, "p1")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let closed = session_service::get_session(&state, &session.id)
        .await
        .unwrap();
    assert_eq!(closed.status, GameStatus::RoundResults);
    let round = closed.round_results.unwrap();
    assert_eq!(round.votes.len(), 1);
    assert_eq!(round.votes[0].votes, 5);
}

#[tokio::test]
async fn host_can_close_a_round_early() {
    let state = state().await;
    let code = lobby(&state, 2).await;
    session_service::start(&state, &code, "ann").await.unwrap();
    session_service::submit_vote(&state, &code, vote("ann", "bob"))
        .await
        .unwrap();

    let refused = session_service::close_round(&state, &code, "bob")
        .await
        .unwrap_err();
    assert!(matches!(
        refused,
        ServiceError::Rejected(ActionError::NotHost { .. })
    ));

    let closed = session_service::close_round(&state, &code, "ann").await.unwrap();
    assert_eq!(closed.session.status, GameStatus::RoundResults);

    let stale = session_service::close_round_on_timer(&state, &code, 0)
        .await
        .unwrap_err();
    assert!(matches!(stale, ServiceError::Rejected(_)));
}

#[tokio::test]
async fn round_timer_closes_the_open_round() {
    let state = state_with(AppConfig {
        server_round_timer: true,
        ..AppConfig::default()
    })
    .await;
    let session = session_service::create_session(
        &state,
        CreateSessionRequest {
            timer_duration: Some(1),
            ..create(2)
        },
    )
    .await
    .unwrap();
    for (name, id) in [("Ann", "ann"), ("Bob", "bob")] {
        session_service::join(&state, &session.id, join_as(name, id))
            .await
            .unwrap();
    }
    session_service::start(&state, &session.id, "ann").await.unwrap();
    assert_eq!(state.round_timers().armed_round(&session.id), Some(0));

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let after = session_service::get_session(&state, &session.id)
        .await
        .unwrap();
    assert_eq!(after.status, GameStatus::RoundResults);
    assert_eq!(state.round_timers().armed_round(&session.id), None);
}

#[tokio::test]
async fn deleting_a_session_notifies_and_forgets_it() {
    let state = state().await;
    let code = lobby(&state, 1).await;
    let mut events = state.sse().subscribe(&code);

    session_service::delete_session(&state, &code).await.unwrap();

    let notice = events.recv().await.unwrap();
    assert_eq!(notice.event.as_deref(), Some("notice"));
    assert_eq!(state.sse().hub_count(), 0);

    let gone = session_service::get_session(&state, &code).await.unwrap_err();
    assert!(matches!(gone, ServiceError::NotFound(_)));
    let again = session_service::delete_session(&state, &code)
        .await
        .unwrap_err();
    assert!(matches!(again, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn requested_codes_must_be_free() {
    let state = state().await;
    let request = || CreateSessionRequest {
        code: Some("wxyz".into()),
        ..create(1)
    };

    let created = session_service::create_session(&state, request())
        .await
        .unwrap();
    assert_eq!(created.id, "WXYZ");

    let taken = session_service::create_session(&state, request())
        .await
        .unwrap_err();
    assert!(matches!(taken, ServiceError::Conflict(_)));

    let listed = session_service::list_sessions(&state).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn degraded_mode_rejects_calls() {
    let state = AppState::new(AppConfig::default());
    let err = session_service::create_session(&state, create(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));
}

#[tokio::test]
async fn zero_round_games_are_refused() {
    let state = state().await;
    let err = session_service::create_session(&state, create(0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn stored_zero_round_session_cannot_start() {
    let store = Arc::new(InMemorySessionStore::new());
    store
        .save_session(
            GameSession::new("ZERO".into(), Difficulty::default(), 0, 30).into(),
            None,
        )
        .await
        .unwrap();
    let state = AppState::new(AppConfig {
        server_round_timer: false,
        ..AppConfig::default()
    });
    state.set_session_store(store).await;
    for (name, id) in [("Ann", "ann"), ("Bob", "bob")] {
        session_service::join(&state, "ZERO", join_as(name, id))
            .await
            .unwrap();
    }

    let err = session_service::start(&state, "ZERO", "ann")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rejected(ActionError::NoRounds)));

    let session = session_service::get_session(&state, "ZERO").await.unwrap();
    assert_eq!(session.status, GameStatus::Lobby);
}

#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
}

impl QuestionGenerator for CountingGenerator {
    fn generate(
        &self,
        request: GenerateQuestionsRequest,
    ) -> BoxFuture<'static, Result<GenerateQuestionsResponse, GeneratorError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let questions = (0..request.num_questions)
            .map(|i| format!("generated prompt {i}?"))
            .collect();
        async move { Ok(GenerateQuestionsResponse { questions }) }.boxed()
    }
}

#[tokio::test]
async fn refused_starts_do_not_call_the_generator() {
    let generator = Arc::new(CountingGenerator::default());
    let state = AppState::with_generator(
        AppConfig {
            server_round_timer: false,
            question_source: QuestionSource::Generated,
            ..AppConfig::default()
        },
        Some(generator.clone() as Arc<dyn QuestionGenerator>),
    );
    state
        .set_session_store(Arc::new(InMemorySessionStore::new()))
        .await;
    let code = lobby(&state, 2).await;

    let not_host = session_service::start(&state, &code, "bob")
        .await
        .unwrap_err();
    assert!(matches!(
        not_host,
        ServiceError::Rejected(ActionError::NotHost { .. })
    ));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let started = session_service::start(&state, &code, "ann").await.unwrap();
    assert_eq!(started.session.question_count, 2);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    let again = session_service::start(&state, &code, "ann")
        .await
        .unwrap_err();
    assert!(matches!(
        again,
        ServiceError::Rejected(ActionError::InvalidTransition(_))
    ));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_codes_leave_no_hub_or_gate_behind() {
    let state = state().await;

    for _ in 0..3 {
        let err = sse_service::subscribe_session(&state, "NOPE")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
    assert_eq!(state.sse().hub_count(), 0);

    let err = session_service::join(&state, "NOPE", join_as("Ann", "ann"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = session_service::advance(&state, "GONE", "ann")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = session_service::delete_session(&state, "LOST")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(state.gate_count(), 0);

    let code = lobby(&state, 1).await;
    assert_eq!(state.gate_count(), 1);
    let subscription = sse_service::subscribe_session(&state, &code).await.unwrap();
    assert!(subscription.snapshot.is_some());
    assert_eq!(state.sse().hub_count(), 1);
}

#[tokio::test]
async fn skipping_round_results_still_reports_the_next_round() {
    let state = state_with(AppConfig {
        server_round_timer: false,
        show_round_results: false,
        ..AppConfig::default()
    })
    .await;
    let code = lobby(&state, 2).await;
    session_service::start(&state, &code, "ann").await.unwrap();
    let mut events = state.sse().subscribe(&code);

    session_service::submit_vote(&state, &code, vote("ann", "bob"))
        .await
        .unwrap();
    let first_vote = events.recv().await.unwrap();
    assert_eq!(first_vote.event.as_deref(), Some("session.updated"));

    let last = session_service::submit_vote(&state, &code, vote("bob", "ann"))
        .await
        .unwrap();
    assert_eq!(last.session.status, GameStatus::Playing);
    assert_eq!(last.session.current_question_index, 1);

    let next_round = events.recv().await.unwrap();
    assert_eq!(next_round.event.as_deref(), Some("status.changed"));
    assert!(next_round.data.contains("\"to\":\"playing\""));
}
