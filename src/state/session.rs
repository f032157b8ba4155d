//! Runtime representation of a game session and its players, questions and votes.

use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{
    dao::models::{PlayerAnswerEntity, PlayerEntity, QuestionEntity, SessionEntity},
    state::state_machine::GameStatus,
};

/// Opaque per-device player identifier, unique within a session.
pub type PlayerId = String;
/// Identifier of a drawn question, unique within a session.
pub type QuestionId = String;

/// Named question pool bucket controlling prompt content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    /// Light-hearted prompts suitable for everyone.
    #[default]
    FamilyFriendly,
    /// More revealing prompts for close friends.
    GettingPersonal,
    /// Daring prompts for adults only.
    HotSeatExclusive,
}

impl Difficulty {
    /// Every tier, in menu order.
    pub const ALL: [Difficulty; 3] = [
        Difficulty::FamilyFriendly,
        Difficulty::GettingPersonal,
        Difficulty::HotSeatExclusive,
    ];

    /// Wire name of the tier.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::FamilyFriendly => "family-friendly",
            Difficulty::GettingPersonal => "getting-personal",
            Difficulty::HotSeatExclusive => "hot-seat-exclusive",
        }
    }

    /// Category assigned to prompts that arrive without one (generated prompts).
    pub fn signature_category(self) -> QuestionCategory {
        match self {
            Difficulty::FamilyFriendly => QuestionCategory::Life,
            Difficulty::GettingPersonal => QuestionCategory::Love,
            Difficulty::HotSeatExclusive => QuestionCategory::Daring,
        }
    }
}

/// Fixed category tag used for end-of-game awards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum QuestionCategory {
    /// Everyday life prompts.
    #[default]
    Life,
    /// Silly prompts.
    Wacky,
    /// Relationship prompts.
    Love,
    /// Risky prompts.
    Daring,
}

impl QuestionCategory {
    /// Every category, in award display order.
    pub const ALL: [QuestionCategory; 4] = [
        QuestionCategory::Life,
        QuestionCategory::Wacky,
        QuestionCategory::Love,
        QuestionCategory::Daring,
    ];
}

/// A participant of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Device-generated identifier.
    pub id: PlayerId,
    /// Display name, unique (case-insensitive) within the session.
    pub name: String,
    /// Number of times this player was chosen. Only meaningful once the game is finished.
    pub score: u32,
}

impl Player {
    /// Fresh player with a zero score.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score: 0,
        }
    }
}

/// An immutable "who is most likely to" prompt drawn for this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Identifier used as key in [`GameSession::all_answers`].
    pub id: QuestionId,
    /// Prompt text.
    pub text: String,
    /// Award category.
    pub category: QuestionCategory,
}

/// One player's vote on one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAnswer {
    /// Player who voted.
    pub player_id: PlayerId,
    /// Player who was chosen.
    pub chosen_player_id: PlayerId,
}

/// Aggregate root holding the whole state of one played-through game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    /// Short human-typed session code.
    pub id: String,
    /// Players in join order; the first one is the host.
    pub players: Vec<Player>,
    /// Questions drawn when the game started.
    pub questions: Vec<Question>,
    /// Votes keyed by question identifier.
    pub all_answers: IndexMap<QuestionId, Vec<PlayerAnswer>>,
    /// Index of the question currently being played.
    pub current_question_index: usize,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Question pool tier.
    pub difficulty: Difficulty,
    /// Number of questions drawn at start.
    pub num_rounds: u32,
    /// Per-round timer, in seconds.
    pub timer_duration: u32,
    /// Store revision this snapshot was read at (0 when never persisted).
    pub revision: u64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last mutation timestamp.
    pub updated_at: SystemTime,
}

impl GameSession {
    /// Build a new lobby session with no players.
    pub fn new(id: String, difficulty: Difficulty, num_rounds: u32, timer_duration: u32) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            players: Vec::new(),
            questions: Vec::new(),
            all_answers: IndexMap::new(),
            current_question_index: 0,
            status: GameStatus::Lobby,
            difficulty,
            num_rounds,
            timer_duration,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The first-joined player, if any.
    pub fn host(&self) -> Option<&Player> {
        self.players.first()
    }

    /// Whether `player_id` identifies the host.
    pub fn is_host(&self, player_id: &str) -> bool {
        self.host().is_some_and(|host| host.id == player_id)
    }

    /// Look up a player by identifier.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == player_id)
    }

    /// Whether a player with a case-insensitively equal name already joined.
    pub fn has_player_named(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        self.players
            .iter()
            .any(|player| player.name.trim().to_lowercase() == wanted)
    }

    /// Question being played, only while a round is open or being displayed.
    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            GameStatus::Playing | GameStatus::RoundResults => {
                self.questions.get(self.current_question_index)
            }
            GameStatus::Lobby | GameStatus::Results => None,
        }
    }

    /// Votes recorded for a question, empty when none.
    pub fn answers_for(&self, question_id: &str) -> &[PlayerAnswer] {
        self.all_answers
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether every player has a vote recorded for the question.
    pub fn everyone_voted(&self, question_id: &str) -> bool {
        let answers = self.answers_for(question_id);
        self.players
            .iter()
            .all(|player| answers.iter().any(|answer| answer.player_id == player.id))
    }

    /// Total number of vote records across all questions.
    pub fn total_answers(&self) -> usize {
        self.all_answers.values().map(Vec::len).sum()
    }

    /// Whether the current question is the last one drawn.
    pub fn on_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.questions.len()
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            score: value.score,
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(value: Player) -> Self {
        Self {
            id: value.id,
            name: value.name,
            score: value.score,
        }
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            category: value.category,
        }
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        Self {
            id: value.id,
            text: value.text,
            category: value.category,
        }
    }
}

impl From<PlayerAnswerEntity> for PlayerAnswer {
    fn from(value: PlayerAnswerEntity) -> Self {
        Self {
            player_id: value.player_id,
            chosen_player_id: value.chosen_player_id,
        }
    }
}

impl From<PlayerAnswer> for PlayerAnswerEntity {
    fn from(value: PlayerAnswer) -> Self {
        Self {
            player_id: value.player_id,
            chosen_player_id: value.chosen_player_id,
        }
    }
}

impl From<SessionEntity> for GameSession {
    fn from(value: SessionEntity) -> Self {
        let created_at = value
            .created_at
            .map(SystemTime::from)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let updated_at = value.updated_at.map(SystemTime::from).unwrap_or(created_at);

        Self {
            id: value.id,
            players: value.players.into_iter().map(Into::into).collect(),
            questions: value.questions.into_iter().map(Into::into).collect(),
            all_answers: value
                .all_answers
                .into_iter()
                .map(|(question_id, answers)| {
                    (question_id, answers.into_iter().map(Into::into).collect())
                })
                .collect(),
            current_question_index: value.current_question_index,
            status: value.status,
            difficulty: value.difficulty,
            num_rounds: value.num_rounds,
            timer_duration: value.timer_duration,
            revision: value.revision,
            created_at,
            updated_at,
        }
    }
}

impl From<GameSession> for SessionEntity {
    fn from(value: GameSession) -> Self {
        Self {
            id: value.id,
            players: value.players.into_iter().map(Into::into).collect(),
            questions: value.questions.into_iter().map(Into::into).collect(),
            all_answers: value
                .all_answers
                .into_iter()
                .map(|(question_id, answers)| {
                    (question_id, answers.into_iter().map(Into::into).collect())
                })
                .collect(),
            current_question_index: value.current_question_index,
            status: value.status,
            difficulty: value.difficulty,
            num_rounds: value.num_rounds,
            timer_duration: value.timer_duration,
            revision: value.revision,
            created_at: Some(OffsetDateTime::from(value.created_at)),
            updated_at: Some(OffsetDateTime::from(value.updated_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby_with(names: &[(&str, &str)]) -> GameSession {
        let mut session = GameSession::new("ABCD".into(), Difficulty::FamilyFriendly, 3, 30);
        session.players = names
            .iter()
            .map(|(id, name)| Player::new(*id, *name))
            .collect();
        session
    }

    #[test]
    fn first_player_is_host() {
        let session = lobby_with(&[("p1", "Ann"), ("p2", "Bob")]);
        assert!(session.is_host("p1"));
        assert!(!session.is_host("p2"));
        assert!(!lobby_with(&[]).is_host("p1"));
    }

    #[test]
    fn name_lookup_ignores_case_and_padding() {
        let session = lobby_with(&[("p1", "Ann")]);
        assert!(session.has_player_named("ann"));
        assert!(session.has_player_named("  ANN "));
        assert!(!session.has_player_named("Anna"));
    }

    #[test]
    fn entity_round_trip_keeps_answers_order() {
        let mut session = lobby_with(&[("p1", "Ann"), ("p2", "Bob")]);
        session.all_answers.insert(
            "q2".into(),
            vec![PlayerAnswer {
                player_id: "p1".into(),
                chosen_player_id: "p2".into(),
            }],
        );
        session.all_answers.insert("q1".into(), Vec::new());

        let entity: SessionEntity = session.clone().into();
        let restored: GameSession = entity.into();

        let keys: Vec<_> = restored.all_answers.keys().cloned().collect();
        assert_eq!(keys, vec!["q2".to_string(), "q1".to_string()]);
        assert_eq!(restored.players, session.players);
    }

    #[test]
    fn signature_categories_cover_every_tier() {
        assert_eq!(
            Difficulty::HotSeatExclusive.signature_category(),
            QuestionCategory::Daring
        );
        assert_eq!(
            Difficulty::GettingPersonal.signature_category(),
            QuestionCategory::Love
        );
        assert_eq!(
            Difficulty::FamilyFriendly.signature_category(),
            QuestionCategory::Life
        );
    }
}
