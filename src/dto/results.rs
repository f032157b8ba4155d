use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::session::RoundView,
    state::{
        scoring::{CategoryAward, GameResults, PlayerStanding},
        session::QuestionCategory,
    },
};

/// A player's final position.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandingView {
    /// Player id.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Times chosen.
    pub score: u32,
}

impl From<PlayerStanding> for StandingView {
    fn from(value: PlayerStanding) -> Self {
        Self {
            player_id: value.player_id,
            name: value.name,
            score: value.score,
        }
    }
}

/// Award for one category.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AwardView {
    /// Category.
    pub category: QuestionCategory,
    /// Winner.
    pub player_id: String,
    /// Votes received in the category.
    pub votes: u32,
    /// Other players with the same count.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tied_with: Vec<String>,
}

impl From<CategoryAward> for AwardView {
    fn from(value: CategoryAward) -> Self {
        Self {
            category: value.category,
            player_id: value.player_id,
            votes: value.votes,
            tied_with: value.tied_with,
        }
    }
}

/// Final screen: ranking, per-round winners and awards.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResultsResponse {
    /// Session code.
    pub session_id: String,
    /// Players by descending score.
    pub ranking: Vec<StandingView>,
    /// Second place, when at least two players.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_up: Option<StandingView>,
    /// Every round in play order.
    pub rounds: Vec<RoundView>,
    /// Category awards.
    pub awards: Vec<AwardView>,
    /// Number of votes cast.
    pub total_votes: usize,
}

impl ResultsResponse {
    /// Wrap engine results for a session.
    pub fn new(session_id: String, results: GameResults) -> Self {
        Self {
            session_id,
            ranking: results.ranking.into_iter().map(Into::into).collect(),
            runner_up: results.runner_up.map(Into::into),
            rounds: results.rounds.into_iter().map(Into::into).collect(),
            awards: results.awards.into_iter().map(Into::into).collect(),
            total_votes: results.total_votes,
        }
    }
}
