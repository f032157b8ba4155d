use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    questions::bank::{self, PoolExhausted, QuestionSeed},
    state::{
        scoring,
        session::{GameSession, Player, PlayerAnswer, PlayerId},
    },
};

/// Lifecycle statuses a session moves through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Players are joining; no questions are drawn yet.
    #[default]
    Lobby,
    /// A round is open and votes are being collected.
    Playing,
    /// Votes of the last round are displayed until the host advances.
    RoundResults,
    /// Final scoreboard and awards.
    Results,
}

impl GameStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Lobby => "lobby",
            GameStatus::Playing => "playing",
            GameStatus::RoundResults => "round_results",
            GameStatus::Results => "results",
        }
    }
}

/// Events that move a session between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// A player joined the lobby.
    Join,
    /// The host started the game.
    Start,
    /// A vote was recorded for the current round.
    Vote,
    /// The current round stopped accepting votes and its results are shown.
    CloseRound,
    /// The next question was opened.
    NextQuestion,
    /// The last round ended; scores are final.
    Finish,
    /// The session went back to the lobby with the same players.
    Restart,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the session was in when the event was received.
    pub from: GameStatus,
    /// The event that cannot be applied from this status.
    pub event: SessionEvent,
}

/// Compute the status reached by applying `event` from `from`.
pub fn next_status(from: GameStatus, event: SessionEvent) -> Result<GameStatus, InvalidTransition> {
    let next = match (from, event) {
        (GameStatus::Lobby, SessionEvent::Join) => GameStatus::Lobby,
        (GameStatus::Lobby, SessionEvent::Start) => GameStatus::Playing,
        (GameStatus::Playing, SessionEvent::Vote) => GameStatus::Playing,
        (GameStatus::Playing, SessionEvent::CloseRound) => GameStatus::RoundResults,
        (GameStatus::Playing | GameStatus::RoundResults, SessionEvent::NextQuestion) => {
            GameStatus::Playing
        }
        (GameStatus::Playing | GameStatus::RoundResults, SessionEvent::Finish) => {
            GameStatus::Results
        }
        (GameStatus::Results, SessionEvent::Restart) => GameStatus::Lobby,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Who is asking for an action that only an authority may perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A player, identified by id. Only the host passes authority checks.
    Player(PlayerId),
    /// The server itself (round timer).
    Authority,
}

/// Actions a client (or the server) can dispatch against a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Add a player to the lobby.
    Join {
        /// Device-generated identifier.
        player_id: PlayerId,
        /// Requested display name, trimmed before use.
        name: String,
    },
    /// Draw questions and open the first round.
    Start {
        /// Player asking to start; must be the host.
        caller: PlayerId,
        /// Prompts to draw from.
        pool: Vec<QuestionSeed>,
    },
    /// Record (or replace) a vote on the current question.
    SubmitVote {
        /// Player casting the vote.
        voter: PlayerId,
        /// Player being chosen.
        chosen: PlayerId,
    },
    /// Close the current round with whatever votes were collected.
    CloseRound {
        /// Host or server authority.
        actor: Actor,
        /// Round the caller believes is open.
        question_index: usize,
    },
    /// Leave the round results screen.
    Advance {
        /// Player asking to advance; must be the host.
        caller: PlayerId,
    },
    /// Go back to the lobby once the game is over.
    Restart,
}

impl SessionAction {
    /// Event checked against the status table before anything else.
    fn entry_event(&self) -> SessionEvent {
        match self {
            SessionAction::Join { .. } => SessionEvent::Join,
            SessionAction::Start { .. } => SessionEvent::Start,
            SessionAction::SubmitVote { .. } => SessionEvent::Vote,
            SessionAction::CloseRound { .. } => SessionEvent::CloseRound,
            SessionAction::Advance { .. } => SessionEvent::NextQuestion,
            SessionAction::Restart => SessionEvent::Restart,
        }
    }
}

/// Tunable game rules fed to the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Players required before the host can start.
    pub min_players: usize,
    /// Whether a player may choose themselves.
    pub allow_self_vote: bool,
    /// Whether closed rounds stop on a results screen.
    pub show_round_results: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            min_players: 2,
            allow_self_vote: true,
            show_round_results: true,
        }
    }
}

/// Non-fatal conditions reported alongside a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionWarning {
    /// Fewer prompts than rounds; some prompts repeat.
    PoolExhausted(PoolExhausted),
}

/// Result of a successful reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Status before the action.
    pub from: GameStatus,
    /// Status after the action.
    pub to: GameStatus,
    /// Events applied, in order.
    pub events: Vec<SessionEvent>,
    /// Warnings to surface to players.
    pub warnings: Vec<ActionWarning>,
}

impl ActionOutcome {
    /// Whether the action moved the session to another status or opened the next round.
    pub fn status_changed(&self) -> bool {
        self.from != self.to || self.events.contains(&SessionEvent::NextQuestion)
    }
}

/// Reasons an action is rejected. The session is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The action is not allowed in the current status.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The name is empty once trimmed.
    #[error("player name must not be empty")]
    EmptyName,
    /// Another player already uses this name (case-insensitive).
    #[error("name `{name}` is already taken")]
    DuplicateName {
        /// Requested name.
        name: String,
    },
    /// Another player already uses this id.
    #[error("player id `{player_id}` already joined")]
    DuplicatePlayerId {
        /// Requested id.
        player_id: PlayerId,
    },
    /// The caller is not the host.
    #[error("player `{player_id}` is not the host")]
    NotHost {
        /// Caller id.
        player_id: PlayerId,
    },
    /// The id does not match any player of the session.
    #[error("unknown player `{player_id}`")]
    UnknownPlayer {
        /// Unknown id.
        player_id: PlayerId,
    },
    /// Not enough players to start.
    #[error("at least {required} players are required, {actual} joined")]
    NotEnoughPlayers {
        /// Minimum player count.
        required: usize,
        /// Current player count.
        actual: usize,
    },
    /// No prompts available for the selected difficulty.
    #[error("question pool is empty")]
    EmptyQuestionPool,
    /// The session is set to play zero rounds.
    #[error("the game has no rounds to play")]
    NoRounds,
    /// Self-votes are disabled.
    #[error("players cannot vote for themselves")]
    SelfVoteNotAllowed,
    /// No question is open.
    #[error("there is no current question")]
    NoCurrentQuestion,
    /// The round being closed is no longer the current one.
    #[error("round {requested} is not the current round ({current})")]
    StaleRound {
        /// Round the caller asked to close.
        requested: usize,
        /// Round actually open.
        current: usize,
    },
}

/// Apply `action` to `session`, validating every guard before mutating anything.
pub fn reduce<R: Rng + ?Sized>(
    session: &mut GameSession,
    action: SessionAction,
    rules: &Rules,
    rng: &mut R,
) -> Result<ActionOutcome, ActionError> {
    let from = session.status;
    next_status(from, action.entry_event())?;

    let mut outcome = ActionOutcome {
        from,
        to: from,
        events: Vec::new(),
        warnings: Vec::new(),
    };

    match action {
        SessionAction::Join { player_id, name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(ActionError::EmptyName);
            }
            if session.player(&player_id).is_some() {
                return Err(ActionError::DuplicatePlayerId { player_id });
            }
            if session.has_player_named(name) {
                return Err(ActionError::DuplicateName {
                    name: name.to_owned(),
                });
            }

            session.players.push(Player::new(player_id, name));
            apply_event(session, &mut outcome, SessionEvent::Join)?;
        }
        SessionAction::Start { caller, pool } => {
            check_start(session, &caller, rules)?;
            if pool.is_empty() {
                return Err(ActionError::EmptyQuestionPool);
            }

            let draw = bank::draw(&pool, session.num_rounds as usize, rng);
            if draw.questions.is_empty() {
                return Err(ActionError::NoRounds);
            }
            if let Some(exhausted) = draw.exhausted {
                outcome.warnings.push(ActionWarning::PoolExhausted(exhausted));
            }

            session.questions = draw.questions;
            session.all_answers.clear();
            session.current_question_index = 0;
            apply_event(session, &mut outcome, SessionEvent::Start)?;
        }
        SessionAction::SubmitVote { voter, chosen } => {
            if session.player(&voter).is_none() {
                return Err(ActionError::UnknownPlayer { player_id: voter });
            }
            if session.player(&chosen).is_none() {
                return Err(ActionError::UnknownPlayer { player_id: chosen });
            }
            if !rules.allow_self_vote && voter == chosen {
                return Err(ActionError::SelfVoteNotAllowed);
            }
            let question_id = session
                .current_question()
                .map(|question| question.id.clone())
                .ok_or(ActionError::NoCurrentQuestion)?;

            let answers = session.all_answers.entry(question_id.clone()).or_default();
            answers.retain(|answer| answer.player_id != voter);
            answers.push(PlayerAnswer {
                player_id: voter,
                chosen_player_id: chosen,
            });
            apply_event(session, &mut outcome, SessionEvent::Vote)?;

            if session.everyone_voted(&question_id) {
                close_round(session, &mut outcome, rules)?;
            }
        }
        SessionAction::CloseRound {
            actor,
            question_index,
        } => {
            if let Actor::Player(player_id) = &actor {
                ensure_host(session, player_id)?;
            }
            if session.current_question().is_none() {
                return Err(ActionError::NoCurrentQuestion);
            }
            if question_index != session.current_question_index {
                return Err(ActionError::StaleRound {
                    requested: question_index,
                    current: session.current_question_index,
                });
            }

            close_round(session, &mut outcome, rules)?;
        }
        SessionAction::Advance { caller } => {
            if session.status != GameStatus::RoundResults {
                return Err(InvalidTransition {
                    from: session.status,
                    event: SessionEvent::NextQuestion,
                }
                .into());
            }
            ensure_host(session, &caller)?;

            advance(session, &mut outcome)?;
        }
        SessionAction::Restart => {
            session.questions.clear();
            session.all_answers.clear();
            session.current_question_index = 0;
            for player in &mut session.players {
                player.score = 0;
            }
            apply_event(session, &mut outcome, SessionEvent::Restart)?;
        }
    }

    Ok(outcome)
}

/// Guards of [`SessionAction::Start`] that do not depend on the question pool.
pub fn check_start(session: &GameSession, caller: &str, rules: &Rules) -> Result<(), ActionError> {
    next_status(session.status, SessionEvent::Start)?;
    ensure_host(session, caller)?;
    if session.players.len() < rules.min_players {
        return Err(ActionError::NotEnoughPlayers {
            required: rules.min_players,
            actual: session.players.len(),
        });
    }
    if session.num_rounds == 0 {
        return Err(ActionError::NoRounds);
    }
    Ok(())
}

fn ensure_host(session: &GameSession, player_id: &str) -> Result<(), ActionError> {
    if session.player(player_id).is_none() {
        return Err(ActionError::UnknownPlayer {
            player_id: player_id.to_owned(),
        });
    }
    if !session.is_host(player_id) {
        return Err(ActionError::NotHost {
            player_id: player_id.to_owned(),
        });
    }
    Ok(())
}

fn apply_event(
    session: &mut GameSession,
    outcome: &mut ActionOutcome,
    event: SessionEvent,
) -> Result<(), InvalidTransition> {
    session.status = next_status(session.status, event)?;
    outcome.to = session.status;
    outcome.events.push(event);
    Ok(())
}

fn close_round(
    session: &mut GameSession,
    outcome: &mut ActionOutcome,
    rules: &Rules,
) -> Result<(), InvalidTransition> {
    if rules.show_round_results {
        apply_event(session, outcome, SessionEvent::CloseRound)
    } else {
        advance(session, outcome)
    }
}

fn advance(session: &mut GameSession, outcome: &mut ActionOutcome) -> Result<(), InvalidTransition> {
    if session.on_last_question() {
        let tally = scoring::tally_votes(session);
        for player in &mut session.players {
            player.score = tally.get(&player.id).copied().unwrap_or(0);
        }
        apply_event(session, outcome, SessionEvent::Finish)
    } else {
        session.current_question_index += 1;
        apply_event(session, outcome, SessionEvent::NextQuestion)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::session::{Difficulty, QuestionCategory};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn pool(size: usize) -> Vec<QuestionSeed> {
        (0..size)
            .map(|i| QuestionSeed::new(format!("prompt {i}"), QuestionCategory::ALL[i % 4]))
            .collect()
    }

    fn dispatch(
        session: &mut GameSession,
        action: SessionAction,
        rules: &Rules,
    ) -> Result<ActionOutcome, ActionError> {
        reduce(session, action, rules, &mut rng())
    }

    fn join(session: &mut GameSession, id: &str, name: &str) {
        dispatch(
            session,
            SessionAction::Join {
                player_id: id.into(),
                name: name.into(),
            },
            &Rules::default(),
        )
        .unwrap();
    }

    fn vote(session: &mut GameSession, voter: &str, chosen: &str, rules: &Rules) -> ActionOutcome {
        dispatch(
            session,
            SessionAction::SubmitVote {
                voter: voter.into(),
                chosen: chosen.into(),
            },
            rules,
        )
        .unwrap()
    }

    fn started(rounds: u32, rules: &Rules) -> GameSession {
        let mut session = GameSession::new("WXYZ".into(), Difficulty::FamilyFriendly, rounds, 30);
        join(&mut session, "p1", "Ann");
        join(&mut session, "p2", "Bob");
        join(&mut session, "p3", "Cy");
        dispatch(
            &mut session,
            SessionAction::Start {
                caller: "p1".into(),
                pool: pool(10),
            },
            rules,
        )
        .unwrap();
        session
    }

    #[test]
    fn status_table_accepts_documented_edges() {
        use GameStatus::*;
        use SessionEvent::*;

        let allowed = [
            (Lobby, Join, Lobby),
            (Lobby, Start, Playing),
            (Playing, Vote, Playing),
            (Playing, CloseRound, RoundResults),
            (Playing, NextQuestion, Playing),
            (Playing, Finish, Results),
            (RoundResults, NextQuestion, Playing),
            (RoundResults, Finish, Results),
            (Results, Restart, Lobby),
        ];
        for (from, event, to) in allowed {
            assert_eq!(next_status(from, event), Ok(to), "{from:?} + {event:?}");
        }
    }

    #[test]
    fn status_table_rejects_other_edges() {
        let err = next_status(GameStatus::Results, SessionEvent::Vote).unwrap_err();
        assert_eq!(err.from, GameStatus::Results);
        assert_eq!(err.event, SessionEvent::Vote);
        assert!(next_status(GameStatus::Playing, SessionEvent::Join).is_err());
        assert!(next_status(GameStatus::Lobby, SessionEvent::Restart).is_err());
        assert!(next_status(GameStatus::RoundResults, SessionEvent::Vote).is_err());
    }

    #[test]
    fn join_trims_name_and_rejects_duplicates() {
        let mut session = GameSession::new("ABCD".into(), Difficulty::default(), 3, 30);
        join(&mut session, "p1", "  Ann  ");
        assert_eq!(session.players[0].name, "Ann");

        let err = dispatch(
            &mut session,
            SessionAction::Join {
                player_id: "p2".into(),
                name: "aNN".into(),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert_eq!(err, ActionError::DuplicateName { name: "aNN".into() });

        let err = dispatch(
            &mut session,
            SessionAction::Join {
                player_id: "p2".into(),
                name: "   ".into(),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert_eq!(err, ActionError::EmptyName);

        let err = dispatch(
            &mut session,
            SessionAction::Join {
                player_id: "p1".into(),
                name: "Other".into(),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::DuplicatePlayerId {
                player_id: "p1".into()
            }
        );
        assert_eq!(session.players.len(), 1);
    }

    #[test]
    fn join_is_rejected_once_game_started() {
        let mut session = started(3, &Rules::default());
        let before = session.clone();
        let err = dispatch(
            &mut session,
            SessionAction::Join {
                player_id: "p9".into(),
                name: "Late".into(),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ActionError::InvalidTransition(_)));
        assert_eq!(session, before);
    }

    #[test]
    fn start_guards_are_enforced() {
        let mut session = GameSession::new("ABCD".into(), Difficulty::default(), 3, 30);
        join(&mut session, "p1", "Ann");

        let err = dispatch(
            &mut session,
            SessionAction::Start {
                caller: "p1".into(),
                pool: pool(5),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::NotEnoughPlayers {
                required: 2,
                actual: 1
            }
        );

        join(&mut session, "p2", "Bob");
        let err = dispatch(
            &mut session,
            SessionAction::Start {
                caller: "p2".into(),
                pool: pool(5),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::NotHost {
                player_id: "p2".into()
            }
        );

        let err = dispatch(
            &mut session,
            SessionAction::Start {
                caller: "p1".into(),
                pool: Vec::new(),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert_eq!(err, ActionError::EmptyQuestionPool);
        assert_eq!(session.status, GameStatus::Lobby);
        assert!(session.questions.is_empty());
    }

    #[test]
    fn start_rejects_a_game_without_rounds() {
        let mut session = GameSession::new("ABCD".into(), Difficulty::default(), 0, 30);
        join(&mut session, "p1", "Ann");
        join(&mut session, "p2", "Bob");
        let before = session.clone();

        let err = dispatch(
            &mut session,
            SessionAction::Start {
                caller: "p1".into(),
                pool: pool(5),
            },
            &Rules::default(),
        )
        .unwrap_err();
        assert_eq!(err, ActionError::NoRounds);
        assert_eq!(session, before);
        assert_eq!(
            check_start(&session, "p1", &Rules::default()),
            Err(ActionError::NoRounds)
        );
    }

    #[test]
    fn start_precheck_matches_reducer_guards() {
        let mut session = GameSession::new("ABCD".into(), Difficulty::default(), 3, 30);
        join(&mut session, "p1", "Ann");
        let rules = Rules::default();
        assert!(matches!(
            check_start(&session, "p1", &rules),
            Err(ActionError::NotEnoughPlayers { .. })
        ));

        join(&mut session, "p2", "Bob");
        assert!(matches!(
            check_start(&session, "p2", &rules),
            Err(ActionError::NotHost { .. })
        ));
        assert_eq!(check_start(&session, "p1", &rules), Ok(()));

        let started = started(2, &rules);
        assert!(matches!(
            check_start(&started, "p1", &rules),
            Err(ActionError::InvalidTransition(_))
        ));
    }

    #[test]
    fn start_draws_questions_and_opens_first_round() {
        let session = started(3, &Rules::default());
        assert_eq!(session.status, GameStatus::Playing);
        assert_eq!(session.questions.len(), 3);
        assert_eq!(session.current_question_index, 0);
        assert!(session.all_answers.is_empty());
    }

    #[test]
    fn start_with_small_pool_warns() {
        let mut session = GameSession::new("ABCD".into(), Difficulty::default(), 5, 30);
        join(&mut session, "p1", "Ann");
        join(&mut session, "p2", "Bob");
        let outcome = dispatch(
            &mut session,
            SessionAction::Start {
                caller: "p1".into(),
                pool: pool(2),
            },
            &Rules::default(),
        )
        .unwrap();

        assert_eq!(session.questions.len(), 5);
        assert_eq!(
            outcome.warnings,
            vec![ActionWarning::PoolExhausted(PoolExhausted {
                requested: 5,
                available: 2
            })]
        );
    }

    #[test]
    fn revote_replaces_previous_answer() {
        let rules = Rules::default();
        let mut session = started(3, &rules);
        vote(&mut session, "p1", "p2", &rules);
        vote(&mut session, "p1", "p3", &rules);

        let question_id = session.questions[0].id.clone();
        let answers = session.answers_for(&question_id);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].chosen_player_id, "p3");
        assert_eq!(session.status, GameStatus::Playing);
    }

    #[test]
    fn last_vote_closes_round() {
        let rules = Rules::default();
        let mut session = started(3, &rules);
        vote(&mut session, "p1", "p2", &rules);
        vote(&mut session, "p2", "p1", &rules);
        let outcome = vote(&mut session, "p3", "p1", &rules);

        assert_eq!(session.status, GameStatus::RoundResults);
        assert_eq!(
            outcome.events,
            vec![SessionEvent::Vote, SessionEvent::CloseRound]
        );
    }

    #[test]
    fn last_vote_advances_directly_without_results_screen() {
        let rules = Rules {
            show_round_results: false,
            ..Rules::default()
        };
        let mut session = started(2, &rules);
        vote(&mut session, "p1", "p1", &rules);
        vote(&mut session, "p2", "p1", &rules);
        let outcome = vote(&mut session, "p3", "p1", &rules);
        assert_eq!(session.status, GameStatus::Playing);
        assert_eq!(session.current_question_index, 1);
        assert_eq!(outcome.from, outcome.to);
        assert!(outcome.status_changed());

        for voter in ["p1", "p2", "p3"] {
            vote(&mut session, voter, "p2", &rules);
        }
        assert_eq!(session.status, GameStatus::Results);
    }

    #[test]
    fn vote_rejections_leave_session_untouched() {
        let rules = Rules {
            allow_self_vote: false,
            ..Rules::default()
        };
        let mut session = started(3, &rules);
        let before = session.clone();

        let err = dispatch(
            &mut session,
            SessionAction::SubmitVote {
                voter: "ghost".into(),
                chosen: "p1".into(),
            },
            &rules,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::UnknownPlayer {
                player_id: "ghost".into()
            }
        );

        let err = dispatch(
            &mut session,
            SessionAction::SubmitVote {
                voter: "p1".into(),
                chosen: "p1".into(),
            },
            &rules,
        )
        .unwrap_err();
        assert_eq!(err, ActionError::SelfVoteNotAllowed);
        assert_eq!(session, before);
    }

    #[test]
    fn self_vote_allowed_by_default() {
        let rules = Rules::default();
        let mut session = started(3, &rules);
        vote(&mut session, "p1", "p1", &rules);
        assert_eq!(session.total_answers(), 1);
    }

    #[test]
    fn timer_close_requires_current_round() {
        let rules = Rules::default();
        let mut session = started(3, &rules);

        let err = dispatch(
            &mut session,
            SessionAction::CloseRound {
                actor: Actor::Authority,
                question_index: 1,
            },
            &rules,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::StaleRound {
                requested: 1,
                current: 0
            }
        );

        let err = dispatch(
            &mut session,
            SessionAction::CloseRound {
                actor: Actor::Player("p2".into()),
                question_index: 0,
            },
            &rules,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::NotHost {
                player_id: "p2".into()
            }
        );

        vote(&mut session, "p2", "p3", &rules);
        dispatch(
            &mut session,
            SessionAction::CloseRound {
                actor: Actor::Authority,
                question_index: 0,
            },
            &rules,
        )
        .unwrap();
        assert_eq!(session.status, GameStatus::RoundResults);
        assert_eq!(session.total_answers(), 1);
    }

    #[test]
    fn advance_walks_rounds_then_finalizes_scores() {
        let rules = Rules::default();
        let mut session = started(2, &rules);

        for round in 0..2 {
            vote(&mut session, "p1", "p2", &rules);
            vote(&mut session, "p2", "p2", &rules);
            vote(&mut session, "p3", "p1", &rules);
            assert_eq!(session.status, GameStatus::RoundResults);

            let err = dispatch(
                &mut session,
                SessionAction::Advance {
                    caller: "p3".into(),
                },
                &rules,
            )
            .unwrap_err();
            assert!(matches!(err, ActionError::NotHost { .. }));

            dispatch(
                &mut session,
                SessionAction::Advance {
                    caller: "p1".into(),
                },
                &rules,
            )
            .unwrap();
            if round == 0 {
                assert_eq!(session.status, GameStatus::Playing);
                assert_eq!(session.current_question_index, 1);
            }
        }

        assert_eq!(session.status, GameStatus::Results);
        let scores: Vec<_> = session.players.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![2, 4, 0]);
        let total: u32 = scores.iter().sum();
        assert_eq!(total as usize, session.total_answers());
    }

    #[test]
    fn advance_from_playing_is_invalid() {
        let rules = Rules::default();
        let mut session = started(2, &rules);
        let err = dispatch(
            &mut session,
            SessionAction::Advance {
                caller: "p1".into(),
            },
            &rules,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::InvalidTransition(InvalidTransition {
                from: GameStatus::Playing,
                event: SessionEvent::NextQuestion
            })
        );
    }

    #[test]
    fn restart_keeps_players_and_clears_game() {
        let rules = Rules {
            show_round_results: false,
            ..Rules::default()
        };
        let mut session = started(1, &rules);
        for voter in ["p1", "p2", "p3"] {
            vote(&mut session, voter, "p3", &rules);
        }
        assert_eq!(session.status, GameStatus::Results);

        dispatch(&mut session, SessionAction::Restart, &rules).unwrap();
        assert_eq!(session.status, GameStatus::Lobby);
        assert!(session.questions.is_empty());
        assert!(session.all_answers.is_empty());
        assert_eq!(session.current_question_index, 0);
        assert_eq!(session.players.len(), 3);
        assert!(session.players.iter().all(|p| p.score == 0));
        assert!(session.is_host("p1"));
    }

    #[test]
    fn restart_only_from_results() {
        let mut session = started(1, &Rules::default());
        let err = dispatch(&mut session, SessionAction::Restart, &Rules::default()).unwrap_err();
        assert!(matches!(err, ActionError::InvalidTransition(_)));
    }
}
