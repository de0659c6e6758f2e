use super::{GameDefinition, MiniGame};
use crate::models::commit::RewardPolicy;
use crate::models::game::Verdict;
use crate::models::RewardGrant;
use rand::rngs::StdRng;

/// Pages read before the quiz starts. Not part of the scored rounds.
pub const STORY: [&str; 8] = [
    "Había una vez un niño llamado Tomás que recibía $5 cada semana.",
    "Tomás siempre gastaba todo su dinero en dulces y juguetes.",
    "Un día, vio una bicicleta hermosa pero no tenía dinero para comprarla.",
    "Su abuela le regaló una alcancía y le enseñó a ahorrar.",
    "Cada semana, Tomás guardaba $3 en su alcancía.",
    "Después de varias semanas, ¡su alcancía estaba llena!",
    "Tomás pudo comprar la bicicleta que tanto quería.",
    "Aprendió que ahorrar te ayuda a conseguir lo que deseas.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub prompt: &'static str,
    pub options: [&'static str; 3],
    pub correct: usize,
}

pub const QUESTIONS: [Question; 3] = [
    Question {
        prompt: "¿Qué le pasaba a Tomás al principio?",
        options: ["Ahorraba mucho", "Gastaba todo", "No tenía dinero"],
        correct: 1,
    },
    Question {
        prompt: "¿Quién le dio la alcancía a Tomás?",
        options: ["Su mamá", "Su abuela", "Su amigo"],
        correct: 1,
    },
    Question {
        prompt: "¿Qué compró Tomás al final?",
        options: ["Dulces", "Una bicicleta", "Juguetes"],
        correct: 1,
    },
];

/// Story of Tomás and the piggy bank, followed by a three-question quiz.
pub struct PiggyBankStory {
    definition: GameDefinition,
}

impl PiggyBankStory {
    pub fn new() -> Self {
        Self {
            definition: GameDefinition::new(
                "piggy_bank",
                "La alcancía de Tomás",
                QUESTIONS.len(),
                600,
            )
            .with_reward(RewardPolicy::Flat(RewardGrant::new(20, 55))),
        }
    }

    pub fn story(&self) -> &'static [&'static str] {
        &STORY
    }
}

impl Default for PiggyBankStory {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniGame for PiggyBankStory {
    type Round = Question;
    /// Index of the chosen option
    type Choice = usize;

    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn deal(&self, _rng: &mut StdRng) -> Vec<Question> {
        QUESTIONS.to_vec()
    }

    fn judge(&self, round: &Question, choice: &usize) -> Verdict {
        if *choice == round.correct {
            Verdict::right()
        } else {
            Verdict::wrong(format!("La respuesta era: {}", round.options[round.correct]))
        }
    }
}
