//! Built-in prompts grouped by difficulty, and the draw used when a game starts.

use std::collections::HashMap;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Builder;

use crate::state::session::{Difficulty, Question, QuestionCategory};

use QuestionCategory::{Daring, Life, Love, Wacky};

const FAMILY_FRIENDLY: &[(&str, QuestionCategory)] = &[
    ("be the best looking in the room?", Life),
    ("be the smartest in the group?", Life),
    ("win a hot dog eating contest?", Wacky),
    ("trip over air?", Wacky),
    ("adopt a dozen cats?", Wacky),
    ("tell the corniest jokes?", Wacky),
    ("become a famous influencer?", Life),
    ("survive a zombie apocalypse?", Wacky),
    ("have the best singing voice?", Life),
    ("be the most likely to forget a birthday?", Life),
    ("laugh at the wrong moment?", Wacky),
    ("organize a surprise party?", Life),
    ("binge-watch an entire series in one day?", Life),
    ("be the most competitive during board games?", Life),
    ("have the messiest room?", Life),
];

const GETTING_PERSONAL: &[(&str, QuestionCategory)] = &[
    ("have a secret admirer?", Love),
    ("be the biggest drama queen/king?", Life),
    ("cry during a sad movie?", Life),
    ("have had a crush on a friend's sibling?", Love),
    ("be the most likely to stalk an ex on social media?", Love),
    ("have the most embarrassing childhood nickname?", Wacky),
    ("be the first to get married?", Love),
    ("have a secret talent?", Life),
    ("be the most likely to lie to get out of trouble?", Wacky),
    ("have read someone else's diary?", Wacky),
    ("be the pickiest eater?", Life),
    ("be the most likely to get a tattoo they regret?", Wacky),
    ("be the worst at keeping a secret?", Life),
    ("be the first to have children?", Love),
    ("have the weirdest fear?", Wacky),
];

const HOT_SEAT_EXCLUSIVE: &[(&str, QuestionCategory)] = &[
    ("have lost their v-card first?", Daring),
    ("have the highest body count?", Daring),
    ("be the poorest financially right now?", Life),
    ("have a one-night stand on vacation?", Daring),
    ("have the weirdest internet search history?", Daring),
    ("have a fake ID?", Daring),
    ("get arrested for something silly?", Wacky),
    ("have slept with the most people?", Daring),
    ("be the most likely to ghost someone?", Love),
    ("have a secret OnlyFans account?", Daring),
    ("have hooked up with someone in this room?", Daring),
    ("be the most likely to get into a physical fight?", Wacky),
    ("be the kinkiest?", Daring),
    ("have sent nudes?", Daring),
    ("be the most likely to cheat on a partner?", Love),
];

/// A prompt before it is drawn into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionSeed {
    /// Prompt text, completing "Who is most likely to ...".
    pub text: String,
    /// Award category.
    #[serde(default)]
    pub category: QuestionCategory,
}

impl QuestionSeed {
    /// Build a seed from its parts.
    pub fn new(text: impl Into<String>, category: QuestionCategory) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

/// Fewer prompts were available than rounds requested; the draw repeated some.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolExhausted {
    /// Rounds requested.
    pub requested: usize,
    /// Distinct prompts available.
    pub available: usize,
}

/// Questions picked for a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    /// Questions in play order, each with a fresh id.
    pub questions: Vec<Question>,
    /// Set when the pool was smaller than the request.
    pub exhausted: Option<PoolExhausted>,
}

/// Pick `count` prompts from `pool`.
///
/// Prompts are drawn without replacement. When the pool is too small every prompt is used
/// once and the remaining rounds are filled with random repeats.
pub fn draw<R: Rng + ?Sized>(pool: &[QuestionSeed], count: usize, rng: &mut R) -> Draw {
    let mut picked: Vec<&QuestionSeed> = pool.iter().collect();
    picked.shuffle(rng);

    let exhausted = if count > pool.len() {
        Some(PoolExhausted {
            requested: count,
            available: pool.len(),
        })
    } else {
        picked.truncate(count);
        None
    };

    if !pool.is_empty() {
        while picked.len() < count {
            picked.push(&pool[rng.random_range(0..pool.len())]);
        }
    }

    let questions = picked
        .into_iter()
        .map(|seed| Question {
            id: Builder::from_random_bytes(rng.random())
                .into_uuid()
                .simple()
                .to_string(),
            text: seed.text.clone(),
            category: seed.category,
        })
        .collect();

    Draw {
        questions,
        exhausted,
    }
}

/// Prompt tables keyed by difficulty.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    tiers: HashMap<Difficulty, Vec<QuestionSeed>>,
}

impl QuestionBank {
    /// The prompts shipped with the game.
    pub fn builtin() -> Self {
        let tier = |entries: &[(&str, QuestionCategory)]| {
            entries
                .iter()
                .map(|(text, category)| QuestionSeed::new(*text, *category))
                .collect::<Vec<_>>()
        };

        let tiers = HashMap::from([
            (Difficulty::FamilyFriendly, tier(FAMILY_FRIENDLY)),
            (Difficulty::GettingPersonal, tier(GETTING_PERSONAL)),
            (Difficulty::HotSeatExclusive, tier(HOT_SEAT_EXCLUSIVE)),
        ]);
        Self { tiers }
    }

    /// Built-in prompts with whole tiers replaced by `overrides`.
    pub fn with_overrides(overrides: &HashMap<Difficulty, Vec<QuestionSeed>>) -> Self {
        let mut bank = Self::builtin();
        for (difficulty, seeds) in overrides {
            bank.tiers.insert(*difficulty, seeds.clone());
        }
        bank
    }

    /// Prompts available for a difficulty; empty when the tier has none.
    pub fn pool(&self, difficulty: Difficulty) -> &[QuestionSeed] {
        self.tiers
            .get(&difficulty)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn builtin_tiers_have_fifteen_prompts() {
        let bank = QuestionBank::builtin();
        for difficulty in Difficulty::ALL {
            assert_eq!(bank.pool(difficulty).len(), 15, "{difficulty:?}");
        }
        assert!(
            bank.pool(Difficulty::HotSeatExclusive)
                .iter()
                .any(|seed| seed.category == QuestionCategory::Daring)
        );
    }

    #[test]
    fn draw_without_replacement_when_pool_is_large_enough() {
        let bank = QuestionBank::builtin();
        let mut rng = StdRng::seed_from_u64(1);
        let draw = draw(bank.pool(Difficulty::FamilyFriendly), 10, &mut rng);

        assert!(draw.exhausted.is_none());
        assert_eq!(draw.questions.len(), 10);
        let texts: HashSet<_> = draw.questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts.len(), 10);
        let ids: HashSet<_> = draw.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn draw_repeats_and_reports_exhaustion() {
        let pool = vec![
            QuestionSeed::new("one?", QuestionCategory::Life),
            QuestionSeed::new("two?", QuestionCategory::Love),
        ];
        let mut rng = StdRng::seed_from_u64(2);
        let draw = draw(&pool, 5, &mut rng);

        assert_eq!(draw.questions.len(), 5);
        assert_eq!(
            draw.exhausted,
            Some(PoolExhausted {
                requested: 5,
                available: 2
            })
        );
        let texts: HashSet<_> = draw.questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
    }

    #[test]
    fn overrides_replace_a_whole_tier() {
        let overrides = HashMap::from([(
            Difficulty::GettingPersonal,
            vec![QuestionSeed::new("sing in the shower?", QuestionCategory::Wacky)],
        )]);
        let bank = QuestionBank::with_overrides(&overrides);
        assert_eq!(bank.pool(Difficulty::GettingPersonal).len(), 1);
        assert_eq!(bank.pool(Difficulty::FamilyFriendly).len(), 15);
    }
}
