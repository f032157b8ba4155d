use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::SessionListItemEntity,
    dto::{
        format_system_time,
        sse::NoticeEvent,
        validation::{validate_not_blank, validate_session_code},
    },
    state::{
        scoring,
        session::{Difficulty, GameSession, Player, Question, QuestionCategory},
        state_machine::GameStatus,
    },
};

/// Payload used to open a new session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    /// Question pool tier.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Number of questions to play.
    #[validate(range(min = 1, max = 100))]
    pub num_rounds: u32,
    /// Round timer in seconds; the configured default applies when absent.
    #[validate(range(min = 5, max = 600))]
    pub timer_duration: Option<u32>,
    /// Requested session code; one is generated when absent.
    #[validate(custom(function = "validate_session_code"))]
    pub code: Option<String>,
}

/// Payload used to join a lobby.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct JoinSessionRequest {
    /// Display name.
    #[validate(length(min = 1, max = 32), custom(function = "validate_not_blank"))]
    pub name: String,
    /// Identifier already stored on the device, if any.
    #[validate(length(min = 1, max = 64))]
    pub player_id: Option<String>,
}

/// Payload identifying the player performing a host action.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlayerActionRequest {
    /// Calling player.
    #[validate(length(min = 1, max = 64))]
    pub player_id: String,
}

/// Payload for a vote.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VoteRequest {
    /// Voting player.
    #[validate(length(min = 1, max = 64))]
    pub player_id: String,
    /// Chosen player.
    #[validate(length(min = 1, max = 64))]
    pub chosen_player_id: String,
}

/// Player as seen by clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerView {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Final score; zero before the results screen.
    pub score: u32,
}

impl From<&Player> for PlayerView {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            score: value.score,
        }
    }
}

/// Question as seen by clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    /// Identifier.
    pub id: String,
    /// Prompt text.
    pub text: String,
    /// Award category.
    pub category: QuestionCategory,
}

impl From<&Question> for QuestionView {
    fn from(value: &Question) -> Self {
        Self {
            id: value.id.clone(),
            text: value.text.clone(),
            category: value.category,
        }
    }
}

/// Votes received by one player in a round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VoteCount {
    /// Chosen player.
    pub player_id: String,
    /// Number of votes.
    pub votes: u32,
}

/// Outcome of one round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundView {
    /// The question played.
    pub question: QuestionView,
    /// Votes per chosen player, players without votes omitted.
    pub votes: Vec<VoteCount>,
    /// Players tied at the highest count; empty when nobody voted.
    pub winners: Vec<String>,
}

impl From<scoring::RoundOutcome> for RoundView {
    fn from(value: scoring::RoundOutcome) -> Self {
        Self {
            question: QuestionView::from(&value.question),
            votes: value
                .votes
                .into_iter()
                .map(|(player_id, votes)| VoteCount { player_id, votes })
                .collect(),
            winners: value.winners,
        }
    }
}

/// Full session state pushed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    /// Session code.
    pub id: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Question pool tier.
    pub difficulty: Difficulty,
    /// Number of rounds.
    pub num_rounds: u32,
    /// Round timer in seconds.
    pub timer_duration: u32,
    /// Players in join order.
    pub players: Vec<PlayerView>,
    /// First-joined player.
    pub host_id: Option<String>,
    /// Number of questions drawn.
    pub question_count: usize,
    /// Index of the current question.
    pub current_question_index: usize,
    /// Current question while playing or showing round results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionView>,
    /// Players who already voted on the current question.
    pub answered_player_ids: Vec<String>,
    /// Outcome of the round just closed, while showing round results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_results: Option<RoundView>,
    /// Store revision.
    pub revision: u64,
    /// Last update, RFC 3339.
    pub updated_at: String,
}

impl From<&GameSession> for SessionView {
    fn from(session: &GameSession) -> Self {
        let current_question = session.current_question();
        let answered_player_ids = current_question
            .map(|question| {
                session
                    .answers_for(&question.id)
                    .iter()
                    .map(|answer| answer.player_id.clone())
                    .collect()
            })
            .unwrap_or_default();

        let round_results = match session.status {
            GameStatus::RoundResults => scoring::round_winners(session)
                .into_iter()
                .nth(session.current_question_index)
                .map(RoundView::from),
            _ => None,
        };

        Self {
            id: session.id.clone(),
            status: session.status,
            difficulty: session.difficulty,
            num_rounds: session.num_rounds,
            timer_duration: session.timer_duration,
            players: session.players.iter().map(PlayerView::from).collect(),
            host_id: session.host().map(|host| host.id.clone()),
            question_count: session.questions.len(),
            current_question_index: session.current_question_index,
            current_question: current_question.map(QuestionView::from),
            answered_player_ids,
            round_results,
            revision: session.revision,
            updated_at: format_system_time(session.updated_at),
        }
    }
}

/// One row of the session listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionListItem {
    /// Session code.
    pub id: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Question pool tier.
    pub difficulty: Difficulty,
    /// Number of joined players.
    pub player_count: usize,
}

impl From<SessionListItemEntity> for SessionListItem {
    fn from(value: SessionListItemEntity) -> Self {
        Self {
            id: value.id,
            status: value.status,
            difficulty: value.difficulty,
            player_count: value.player_count,
        }
    }
}

/// Answer to a successful join.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinResponse {
    /// The new player.
    pub player: PlayerView,
    /// Whether this player is the host.
    pub is_host: bool,
    /// Key under which the client should persist `player.id`.
    pub identity_key: String,
    /// Session after the join.
    pub session: SessionView,
}

/// Answer to a re-identification request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerIdentityResponse {
    /// The player.
    pub player: PlayerView,
    /// Whether this player is the host.
    pub is_host: bool,
}

/// Answer to any state-changing action.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Session after the action.
    pub session: SessionView,
    /// Warnings raised by the action (also pushed as notices).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NoticeEvent>,
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;
    use crate::state::session::PlayerAnswer;

    #[test]
    fn create_request_bounds_are_validated() {
        let ok: CreateSessionRequest = serde_json::from_value(serde_json::json!({
            "difficulty": "getting-personal",
            "num_rounds": 5,
            "timer_duration": 20
        }))
        .unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.difficulty, Difficulty::GettingPersonal);

        let bad = CreateSessionRequest {
            difficulty: Difficulty::default(),
            num_rounds: 0,
            timer_duration: Some(1),
            code: Some("A!".into()),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("num_rounds"));
        assert!(fields.contains_key("timer_duration"));
        assert!(fields.contains_key("code"));
    }

    #[test]
    fn blank_names_are_rejected() {
        let request = JoinSessionRequest {
            name: "   ".into(),
            player_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn view_exposes_current_round_results() {
        let mut session = GameSession::new("ABCD".into(), Difficulty::default(), 1, 30);
        session.players = vec![Player::new("p1", "Ann"), Player::new("p2", "Bob")];
        session.questions = vec![Question {
            id: "q1".into(),
            text: "trip over air?".into(),
            category: QuestionCategory::Wacky,
        }];
        session.all_answers.insert(
            "q1".into(),
            vec![PlayerAnswer {
                player_id: "p1".into(),
                chosen_player_id: "p2".into(),
            }],
        );
        session.status = GameStatus::Playing;

        let view = SessionView::from(&session);
        assert_eq!(view.answered_player_ids, vec!["p1"]);
        assert!(view.round_results.is_none());
        assert_eq!(view.host_id.as_deref(), Some("p1"));

        session.status = GameStatus::RoundResults;
        let view = SessionView::from(&session);
        let round = view.round_results.unwrap();
        assert_eq!(round.winners, vec!["p2"]);

        let json = serde_json::to_value(SessionView::from(&session)).unwrap();
        assert_eq!(json["status"], "round_results");
    }
}
