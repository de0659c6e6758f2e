//! Mini-game catalogue. Round-based games implement [`MiniGame`] and are
//! driven by the round engine; the simulations (savings, lemonade, interest)
//! keep their own state and hand back a finished [`ScoreResult`].

use crate::models::commit::{BadgeRule, RewardPolicy};
use crate::models::game::Verdict;
use crate::models::{ModuleId, RewardGrant, ScoreResult};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::fmt;
use std::time::Duration;

pub mod coins;
pub mod counting;
pub mod debt;
pub mod interest;
pub mod lemonade;
pub mod needs_wants;
pub mod piggy_bank;
pub mod savings;

pub use coins::CoinRecognition;
pub use counting::CountingMoney;
pub use debt::DebtScenarios;
pub use interest::InterestCalculator;
pub use lemonade::LemonadeStand;
pub use needs_wants::NeedsWants;
pub use piggy_bank::PiggyBankStory;
pub use savings::SavingsChallenge;

/// Static description of a game: what it is called, how long a session is
/// and how it pays out.
#[derive(Debug, Clone)]
pub struct GameDefinition {
    pub module_id: ModuleId,
    pub title: &'static str,
    pub rounds: usize,
    pub feedback_delay: Duration,
    pub reward: RewardPolicy,
    pub badges: Vec<BadgeRule>,
}

impl GameDefinition {
    pub fn new(module_id: &str, title: &'static str, rounds: usize, feedback_delay_ms: u64) -> Self {
        Self {
            module_id: ModuleId::new(module_id),
            title,
            rounds,
            feedback_delay: Duration::from_millis(feedback_delay_ms),
            reward: RewardPolicy::Flat(RewardGrant::default()),
            badges: Vec::new(),
        }
    }

    pub fn with_reward(mut self, reward: RewardPolicy) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_badge(mut self, rule: BadgeRule) -> Self {
        self.badges.push(rule);
        self
    }
}

/// A round-based game the engine can drive
pub trait MiniGame: Send + Sync + 'static {
    type Round: Clone + fmt::Debug + Send + Sync + 'static;
    type Choice: fmt::Debug + Send + 'static;

    fn definition(&self) -> &GameDefinition;

    /// Deals the whole session up front. Must return exactly `definition().rounds` rounds.
    fn deal(&self, rng: &mut StdRng) -> Vec<Self::Round>;

    fn judge(&self, round: &Self::Round, choice: &Self::Choice) -> Verdict;
}

/// A game that keeps its own state and is scored once it is over
pub trait Simulation {
    fn definition(&self) -> &GameDefinition;

    /// `None` until the simulation has finished.
    fn result(&self) -> Option<ScoreResult>;

    fn reward(&self, score: &ScoreResult) -> RewardGrant {
        self.definition().reward.grant(score)
    }
}

/// Draws `count` items so that no two neighbours share the same key.
/// Falls back to plain sampling when the bank has a single distinct key.
pub(crate) fn draw_without_consecutive_repeat<'a, T, K, F>(
    bank: &'a [T],
    count: usize,
    rng: &mut StdRng,
    key: F,
) -> Vec<&'a T>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut drawn: Vec<&T> = Vec::with_capacity(count);
    for _ in 0..count {
        let previous = drawn.last().map(|item| key(*item));
        let candidates: Vec<&T> = bank
            .iter()
            .filter(|item| previous.as_ref() != Some(&key(*item)))
            .collect();
        let pick = if candidates.is_empty() {
            bank.choose(rng)
        } else {
            candidates.choose(rng).copied()
        };
        match pick {
            Some(item) => drawn.push(item),
            None => break,
        }
    }
    drawn
}
