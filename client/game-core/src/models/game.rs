use super::ScoreResult;
use serde::Serialize;

/// Coarse lifecycle of a round engine. `restart` is the only way back to `Intro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    Intro,
    Playing,
    Summary,
}

/// Outcome of judging one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub correct: bool,
    pub explanation: Option<String>,
}

impl Verdict {
    pub fn right() -> Self {
        Self {
            correct: true,
            explanation: None,
        }
    }

    pub fn wrong(explanation: impl Into<String>) -> Self {
        Self {
            correct: false,
            explanation: Some(explanation.into()),
        }
    }

    pub fn from_match(correct: bool) -> Self {
        Self {
            correct,
            explanation: None,
        }
    }
}

/// Returned to the UI right after a submission, before the feedback delay runs out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub round_index: usize,
    pub correct: bool,
    pub explanation: Option<String>,
}

/// Proof that an advance belongs to a particular session and round.
/// A ticket is only honored once and only while its epoch is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdvanceTicket {
    pub(crate) epoch: u64,
    pub(crate) round_index: usize,
}

impl AdvanceTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextRound { index: usize },
    Finished(ScoreResult),
}

/// Snapshot of the engine published to subscribers on every transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView<R> {
    pub phase: GamePhase,
    pub epoch: u64,
    pub index: usize,
    pub length: usize,
    pub correct: u32,
    pub locked: bool,
    pub round: Option<R>,
    pub last_feedback: Option<AnswerFeedback>,
    pub score: Option<ScoreResult>,
}

impl<R> SessionView<R> {
    pub fn intro(epoch: u64, length: usize) -> Self {
        Self {
            phase: GamePhase::Intro,
            epoch,
            index: 0,
            length,
            correct: 0,
            locked: false,
            round: None,
            last_feedback: None,
            score: None,
        }
    }

    pub fn is_awaiting_answer(&self) -> bool {
        self.phase == GamePhase::Playing && !self.locked
    }
}
