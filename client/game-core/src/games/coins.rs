use super::{draw_without_consecutive_repeat, GameDefinition, MiniGame};
use crate::models::commit::{BadgeRule, RewardPolicy};
use crate::models::game::Verdict;
use crate::models::RewardGrant;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coin {
    pub id: &'static str,
    pub value: u32,
    pub name: &'static str,
}

pub const COINS: [Coin; 4] = [
    Coin { id: "1", value: 1, name: "1 Moneda" },
    Coin { id: "5", value: 5, name: "5 Monedas" },
    Coin { id: "10", value: 10, name: "10 Monedas" },
    Coin { id: "20", value: 20, name: "20 Monedas" },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinRound {
    pub target: Coin,
    pub options: Vec<Coin>,
}

/// "Find the coin": the player picks the coin named in the prompt.
pub struct CoinRecognition {
    definition: GameDefinition,
}

impl CoinRecognition {
    pub fn new() -> Self {
        Self {
            definition: GameDefinition::new("coin_recognition", "Reconoce las monedas", 5, 700)
                .with_reward(RewardPolicy::Flat(RewardGrant::new(20, 50)))
                .with_badge(BadgeRule::at_count("first_module", 1)),
        }
    }
}

impl Default for CoinRecognition {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniGame for CoinRecognition {
    type Round = CoinRound;
    /// Coin id as shown on the option button
    type Choice = String;

    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn deal(&self, rng: &mut StdRng) -> Vec<CoinRound> {
        let targets: Vec<Coin> =
            draw_without_consecutive_repeat(&COINS, self.definition.rounds, rng, |coin| coin.id)
                .into_iter()
                .copied()
                .collect();
        targets
            .into_iter()
            .map(|target| {
                let mut options = COINS.to_vec();
                options.shuffle(rng);
                CoinRound { target, options }
            })
            .collect()
    }

    fn judge(&self, round: &CoinRound, choice: &String) -> Verdict {
        let picked = COINS.iter().find(|coin| coin.id == choice.as_str());
        match picked {
            Some(coin) if coin.value == round.target.value => Verdict::right(),
            _ => Verdict::wrong(format!("Era la moneda de {}", round.target.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn deals_five_rounds_without_repeating_target() {
        let game = CoinRecognition::new();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let rounds = game.deal(&mut rng);
            assert_eq!(rounds.len(), 5);
            assert!(rounds.windows(2).all(|w| w[0].target.id != w[1].target.id));
            assert!(rounds.iter().all(|r| r.options.len() == COINS.len()));
        }
    }

    #[test]
    fn judges_by_coin_value() {
        let game = CoinRecognition::new();
        let round = CoinRound {
            target: COINS[2],
            options: COINS.to_vec(),
        };
        assert!(game.judge(&round, &"10".to_string()).correct);

        let wrong = game.judge(&round, &"5".to_string());
        assert!(!wrong.correct);
        assert_eq!(wrong.explanation.as_deref(), Some("Era la moneda de 10 Monedas"));
        assert!(!game.judge(&round, &"50".to_string()).correct);
    }
}
