//! Score and award aggregation over the votes of a session.
//!
//! Everything here is a pure function of a [`GameSession`]. Votes naming a player that is not
//! part of the session are ignored everywhere.

use indexmap::IndexMap;
use thiserror::Error;

use crate::state::{
    session::{GameSession, PlayerAnswer, PlayerId, Question, QuestionCategory},
    state_machine::GameStatus,
};

/// Errors raised when results are requested too early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// The session has not reached the results screen.
    #[error("session is not finished (status: {status:?})")]
    NotFinished {
        /// Status the session is in.
        status: GameStatus,
    },
}

/// A player with their cumulative vote count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStanding {
    /// Player id.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Times this player was chosen.
    pub score: u32,
}

/// Votes and winners of one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// The question played.
    pub question: Question,
    /// Vote count per chosen player, in join order, players without votes omitted.
    pub votes: IndexMap<PlayerId, u32>,
    /// Every player tied at the maximum count. Empty when nobody voted.
    pub winners: Vec<PlayerId>,
}

/// The player most often chosen on the questions of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAward {
    /// Category the award is for.
    pub category: QuestionCategory,
    /// Earliest-joined player among those with the highest count.
    pub player_id: PlayerId,
    /// Votes received in this category.
    pub votes: u32,
    /// Other players with the same count, in join order.
    pub tied_with: Vec<PlayerId>,
}

/// Everything displayed on the final screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResults {
    /// Players sorted by score, ties kept in join order.
    pub ranking: Vec<PlayerStanding>,
    /// Second-ranked player, when there are at least two players.
    pub runner_up: Option<PlayerStanding>,
    /// Per-question outcome, in play order.
    pub rounds: Vec<RoundOutcome>,
    /// Category awards, for categories that received votes.
    pub awards: Vec<CategoryAward>,
    /// Number of vote records in the session.
    pub total_votes: usize,
}

/// Count how many times each player was chosen, over every question.
///
/// The map has one entry per player, in join order.
pub fn tally_votes(session: &GameSession) -> IndexMap<PlayerId, u32> {
    count_answers(session, session.all_answers.values().flatten())
}

/// Players sorted by descending score. Equal scores keep join order.
pub fn ranking(session: &GameSession) -> Vec<PlayerStanding> {
    let tally = tally_votes(session);
    let mut standings: Vec<_> = session
        .players
        .iter()
        .map(|player| PlayerStanding {
            player_id: player.id.clone(),
            name: player.name.clone(),
            score: tally.get(&player.id).copied().unwrap_or(0),
        })
        .collect();
    standings.sort_by(|a, b| b.score.cmp(&a.score));
    standings
}

/// The second entry of a ranking, if any.
pub fn runner_up(ranking: &[PlayerStanding]) -> Option<&PlayerStanding> {
    ranking.get(1)
}

/// Outcome of every drawn question, in play order.
pub fn round_winners(session: &GameSession) -> Vec<RoundOutcome> {
    session
        .questions
        .iter()
        .map(|question| {
            let counts = count_answers(session, session.answers_for(&question.id));
            let winners = top_players(&counts);
            RoundOutcome {
                question: question.clone(),
                votes: counts.into_iter().filter(|(_, votes)| *votes > 0).collect(),
                winners,
            }
        })
        .collect()
}

/// One award per category whose questions received at least one vote.
pub fn category_awards(session: &GameSession) -> Vec<CategoryAward> {
    QuestionCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let answers = session
                .questions
                .iter()
                .filter(|question| question.category == category)
                .flat_map(|question| session.answers_for(&question.id));
            let counts = count_answers(session, answers);

            let mut winners = top_players(&counts).into_iter();
            let player_id = winners.next()?;
            let votes = counts.get(&player_id).copied().unwrap_or(0);
            Some(CategoryAward {
                category,
                player_id,
                votes,
                tied_with: winners.collect(),
            })
        })
        .collect()
}

/// Bundle the final screen data. Only available once the session reached `results`.
pub fn results(session: &GameSession) -> Result<GameResults, ScoringError> {
    if session.status != GameStatus::Results {
        return Err(ScoringError::NotFinished {
            status: session.status,
        });
    }

    let ranking = ranking(session);
    Ok(GameResults {
        runner_up: runner_up(&ranking).cloned(),
        ranking,
        rounds: round_winners(session),
        awards: category_awards(session),
        total_votes: session.total_answers(),
    })
}

fn count_answers<'a>(
    session: &GameSession,
    answers: impl IntoIterator<Item = &'a PlayerAnswer>,
) -> IndexMap<PlayerId, u32> {
    let mut counts: IndexMap<PlayerId, u32> = session
        .players
        .iter()
        .map(|player| (player.id.clone(), 0))
        .collect();
    for answer in answers {
        if let Some(count) = counts.get_mut(&answer.chosen_player_id) {
            *count += 1;
        }
    }
    counts
}

fn top_players(counts: &IndexMap<PlayerId, u32>) -> Vec<PlayerId> {
    let max = counts.values().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    counts
        .iter()
        .filter(|(_, votes)| **votes == max)
        .map(|(player_id, _)| player_id.clone())
        .collect()
}
