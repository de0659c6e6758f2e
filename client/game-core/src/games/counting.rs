use super::{GameDefinition, MiniGame};
use crate::models::commit::RewardPolicy;
use crate::models::game::Verdict;
use crate::models::RewardGrant;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountingRound {
    pub coin1: u32,
    pub coin2: u32,
    pub total: u32,
    pub options: Vec<u32>,
}

/// Add up two piles of coins and pick the total among three options.
pub struct CountingMoney {
    definition: GameDefinition,
}

impl CountingMoney {
    const OPTION_COUNT: usize = 3;

    pub fn new() -> Self {
        Self {
            definition: GameDefinition::new("counting_money", "Cuenta el dinero", 8, 520)
                .with_reward(RewardPolicy::Flat(RewardGrant::new(25, 65))),
        }
    }

    fn make_round(rng: &mut StdRng) -> CountingRound {
        let coin1 = rng.random_range(1..=5);
        let coin2 = rng.random_range(1..=5);
        let total = coin1 + coin2;

        let mut options = vec![total];
        while options.len() < Self::OPTION_COUNT {
            let candidate = rng.random_range(1..=10);
            if !options.contains(&candidate) {
                options.push(candidate);
            }
        }
        options.shuffle(rng);

        CountingRound {
            coin1,
            coin2,
            total,
            options,
        }
    }
}

impl Default for CountingMoney {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniGame for CountingMoney {
    type Round = CountingRound;
    type Choice = u32;

    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn deal(&self, rng: &mut StdRng) -> Vec<CountingRound> {
        (0..self.definition.rounds)
            .map(|_| Self::make_round(rng))
            .collect()
    }

    fn judge(&self, round: &CountingRound, choice: &u32) -> Verdict {
        if *choice == round.total {
            Verdict::right()
        } else {
            Verdict::wrong(format!("{} + {} = {}", round.coin1, round.coin2, round.total))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn options_are_distinct_and_contain_total() {
        let game = CountingMoney::new();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..25 {
            let rounds = game.deal(&mut rng);
            assert_eq!(rounds.len(), 8);
            for round in rounds {
                assert_eq!(round.total, round.coin1 + round.coin2);
                assert!((1..=5).contains(&round.coin1));
                assert!((1..=5).contains(&round.coin2));
                assert_eq!(round.options.len(), 3);
                assert!(round.options.contains(&round.total));
                let mut sorted = round.options.clone();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), 3);
            }
        }
    }

    #[test]
    fn wrong_answer_shows_the_sum() {
        let game = CountingMoney::new();
        let round = CountingRound {
            coin1: 2,
            coin2: 3,
            total: 5,
            options: vec![5, 7, 1],
        };
        assert!(game.judge(&round, &5).correct);
        assert_eq!(
            game.judge(&round, &7).explanation.as_deref(),
            Some("2 + 3 = 5")
        );
    }
}
