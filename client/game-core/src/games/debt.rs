use super::{GameDefinition, MiniGame};
use crate::models::commit::{BadgeRule, RewardPolicy};
use crate::models::game::Verdict;
use crate::models::RewardGrant;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtAnswer {
    Borrow,
    Save,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub title: &'static str,
    pub situation: &'static str,
    pub borrowed: f64,
    pub interest_rate: f64,
    pub months: f64,
    pub correct: DebtAnswer,
    pub explanation: &'static str,
}

impl Scenario {
    /// What paying back the loan would cost on top of the borrowed amount
    pub fn interest_cost(&self) -> f64 {
        self.borrowed * self.interest_rate / 100.0
    }
}

pub const SCENARIOS: [Scenario; 4] = [
    Scenario {
        title: "La Bicicleta Nueva",
        situation: "Quieres una bicicleta que cuesta $100. Tu amigo te ofrece prestarte el dinero, pero debes devolverle $110 en 2 meses.",
        borrowed: 100.0,
        interest_rate: 10.0,
        months: 2.0,
        correct: DebtAnswer::Save,
        explanation: "Es mejor ahorrar. Si pides prestado, pagas $10 extra (10% de interés).",
    },
    Scenario {
        title: "El Videojuego",
        situation: "Sale un videojuego nuevo a $60. Tu hermano te puede prestar $60 si le devuelves $65 la próxima semana.",
        borrowed: 60.0,
        interest_rate: 8.3,
        months: 0.25,
        correct: DebtAnswer::Save,
        explanation: "Mejor esperar y ahorrar. Pedir prestado te cuesta $5 extra.",
    },
    Scenario {
        title: "Regalo de Cumpleaños",
        situation: "El cumpleaños de tu mejor amigo es mañana. Quieres comprarle un regalo de $20 pero no tienes dinero. Tu mamá te puede prestar.",
        borrowed: 20.0,
        interest_rate: 0.0,
        months: 1.0,
        correct: DebtAnswer::Ask,
        explanation: "Está bien pedir prestado a tu familia en emergencias (sin interés). Solo recuerda devolverlo.",
    },
    Scenario {
        title: "Los Útiles Escolares",
        situation: "Necesitas útiles escolares urgente ($30). La tienda ofrece \"compra ahora, paga después\" pero terminarías pagando $40 en 3 meses.",
        borrowed: 30.0,
        interest_rate: 33.3,
        months: 3.0,
        correct: DebtAnswer::Ask,
        explanation: "Para necesidades escolares, mejor pide ayuda a tus padres. El 33% es altísimo.",
    },
];

/// Four borrowing dilemmas, always in the same order.
pub struct DebtScenarios {
    definition: GameDefinition,
}

impl DebtScenarios {
    pub fn new() -> Self {
        Self {
            definition: GameDefinition::new("debt_game", "Préstamos y deudas", SCENARIOS.len(), 120)
                .with_reward(RewardPolicy::CorrectThreshold {
                    min_correct: 3,
                    met: RewardGrant::new(45, 90),
                    missed: RewardGrant::new(30, 90),
                })
                .with_badge(BadgeRule::at_count("financial_wizard", 4)),
        }
    }
}

impl Default for DebtScenarios {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniGame for DebtScenarios {
    type Round = Scenario;
    type Choice = DebtAnswer;

    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn deal(&self, _rng: &mut StdRng) -> Vec<Scenario> {
        SCENARIOS.to_vec()
    }

    // the explanation is shown after every answer, right or wrong
    fn judge(&self, round: &Scenario, choice: &DebtAnswer) -> Verdict {
        Verdict {
            correct: *choice == round.correct,
            explanation: Some(round.explanation.to_string()),
        }
    }
}
