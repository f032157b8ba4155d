use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::{
    session::{Difficulty, QuestionCategory},
    state_machine::GameStatus,
};

/// Player as stored inside a session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Device-generated identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Final vote count, zero until the game is finished.
    #[serde(default)]
    pub score: u32,
}

/// Question as stored inside a session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Identifier used as key of `allAnswers`.
    pub id: String,
    /// Prompt text.
    pub text: String,
    /// Award category.
    #[serde(default)]
    pub category: QuestionCategory,
}

/// One vote as stored inside a session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnswerEntity {
    /// Player who voted.
    pub player_id: String,
    /// Player who was chosen.
    pub chosen_player_id: String,
}

/// Persisted session document.
///
/// Every field but `id` falls back to its default so older documents still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    /// Session code.
    pub id: String,
    /// Players in join order.
    #[serde(default)]
    pub players: Vec<PlayerEntity>,
    /// Questions drawn at start.
    #[serde(default)]
    pub questions: Vec<QuestionEntity>,
    /// Votes keyed by question id.
    #[serde(default)]
    pub all_answers: IndexMap<String, Vec<PlayerAnswerEntity>>,
    /// Index of the current question.
    #[serde(default)]
    pub current_question_index: usize,
    /// Lifecycle status.
    #[serde(default)]
    pub status: GameStatus,
    /// Question pool tier.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Number of rounds requested.
    #[serde(default)]
    pub num_rounds: u32,
    /// Round timer in seconds.
    #[serde(default)]
    pub timer_duration: u32,
    /// Store revision, bumped on every write.
    #[serde(default)]
    pub revision: u64,
    /// Creation timestamp.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    /// Last write timestamp.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Lightweight projection used when listing sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListItemEntity {
    /// Session code.
    pub id: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Question pool tier.
    pub difficulty: Difficulty,
    /// Number of joined players.
    pub player_count: usize,
    /// Last write timestamp.
    pub updated_at: Option<OffsetDateTime>,
}

impl From<&SessionEntity> for SessionListItemEntity {
    fn from(value: &SessionEntity) -> Self {
        Self {
            id: value.id.clone(),
            status: value.status,
            difficulty: value.difficulty,
            player_count: value.players.len(),
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn minimal_document_loads_with_defaults() {
        let entity: SessionEntity = serde_json::from_value(json!({ "id": "ABCD" })).unwrap();
        assert_eq!(entity.status, GameStatus::Lobby);
        assert_eq!(entity.difficulty, Difficulty::FamilyFriendly);
        assert!(entity.players.is_empty());
        assert_eq!(entity.revision, 0);
        assert!(entity.created_at.is_none());
    }

    #[test]
    fn document_uses_camel_case_keys() {
        let entity: SessionEntity = serde_json::from_value(json!({
            "id": "ABCD",
            "players": [{ "id": "p1", "name": "Ann", "score": 0 }],
            "questions": [{ "id": "q1", "text": "trip over air?", "category": "Wacky" }],
            "allAnswers": { "q1": [{ "playerId": "p1", "chosenPlayerId": "p1" }] },
            "currentQuestionIndex": 0,
            "status": "round_results",
            "difficulty": "hot-seat-exclusive",
            "numRounds": 1,
            "timerDuration": 20,
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(entity.status, GameStatus::RoundResults);
        assert_eq!(entity.difficulty, Difficulty::HotSeatExclusive);
        assert_eq!(entity.all_answers["q1"][0].chosen_player_id, "p1");
        assert!(entity.created_at.is_some());

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["timerDuration"], 20);
        assert_eq!(value["allAnswers"]["q1"][0]["playerId"], "p1");
    }
}
