use super::{GameDefinition, Simulation};
use crate::error::EngineError;
use crate::models::commit::{BadgeRule, RewardPolicy};
use crate::models::{RewardGrant, ScoreResult};

pub const TOTAL_WEEKS: u32 = 8;
pub const DEFAULT_WEEKLY_INCOME: f64 = 10.0;
const MIN_GOAL: f64 = 5.0;
const MAX_GOAL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekRecord {
    pub week: u32,
    pub saved: f64,
    pub spent: f64,
    pub total_saved: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingsPhase {
    Setup,
    Saving,
    Finished,
}

/// Eight weeks of pocket money: each week the player decides how much of the
/// income goes to the piggy bank, until the goal is reached or time runs out.
#[derive(Debug, Clone)]
pub struct SavingsChallenge {
    definition: GameDefinition,
    phase: SavingsPhase,
    goal_name: String,
    goal: f64,
    weekly_income: f64,
    weeks: Vec<WeekRecord>,
}

impl SavingsChallenge {
    pub fn new() -> Self {
        Self {
            definition: GameDefinition::new(
                "savings_challenge",
                "Reto de ahorro",
                TOTAL_WEEKS as usize,
                0,
            )
            .with_reward(RewardPolicy::PercentageThreshold {
                min_percentage: 60,
                met: RewardGrant::new(30, 75),
                missed: RewardGrant::new(20, 75),
            })
            .with_badge(BadgeRule::on_completion("saver")),
            phase: SavingsPhase::Setup,
            goal_name: String::new(),
            goal: 0.0,
            weekly_income: DEFAULT_WEEKLY_INCOME,
            weeks: Vec::new(),
        }
    }

    pub fn set_goal(&mut self, name: &str, amount: f64) -> Result<(), EngineError> {
        if self.phase != SavingsPhase::Setup {
            return Err(EngineError::InvalidMove("goal already set".to_string()));
        }
        if name.trim().is_empty() {
            return Err(EngineError::InvalidMove("goal needs a name".to_string()));
        }
        if !amount.is_finite() || !(MIN_GOAL..=MAX_GOAL).contains(&amount) {
            return Err(EngineError::InvalidMove(format!(
                "goal must be between {} and {}",
                MIN_GOAL, MAX_GOAL
            )));
        }
        self.goal_name = name.trim().to_string();
        self.goal = amount;
        self.phase = SavingsPhase::Saving;
        Ok(())
    }

    /// Records one week. Finishes the challenge when the goal is met or the last week is played.
    pub fn save_week(&mut self, amount: f64) -> Result<WeekRecord, EngineError> {
        if self.phase != SavingsPhase::Saving {
            return Err(EngineError::InvalidMove("not saving right now".to_string()));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::InvalidMove("saved amount cannot be negative".to_string()));
        }
        if amount > self.weekly_income {
            return Err(EngineError::InvalidMove(format!(
                "cannot save more than the weekly income of {}",
                self.weekly_income
            )));
        }

        let record = WeekRecord {
            week: self.weeks.len() as u32 + 1,
            saved: amount,
            spent: self.weekly_income - amount,
            total_saved: self.total_saved() + amount,
        };
        self.weeks.push(record);

        if record.total_saved >= self.goal || record.week >= TOTAL_WEEKS {
            self.phase = SavingsPhase::Finished;
        }
        Ok(record)
    }

    pub fn phase(&self) -> SavingsPhase {
        self.phase
    }

    pub fn goal_name(&self) -> &str {
        &self.goal_name
    }

    pub fn goal(&self) -> f64 {
        self.goal
    }

    pub fn weeks(&self) -> &[WeekRecord] {
        &self.weeks
    }

    pub fn total_saved(&self) -> f64 {
        self.weeks.last().map(|w| w.total_saved).unwrap_or(0.0)
    }

    pub fn achieved(&self) -> bool {
        self.goal > 0.0 && self.total_saved() >= self.goal
    }

    /// Share of the income put aside over the weeks played, in percent
    pub fn average_saving_rate(&self) -> f64 {
        if self.weeks.is_empty() {
            return 0.0;
        }
        self.total_saved() / (self.weekly_income * self.weeks.len() as f64) * 100.0
    }

    /// Reaching the goal sooner scores higher, never below 60.
    /// Missing it scores up to 50 in proportion to what was saved.
    pub fn score(&self) -> u8 {
        let weeks = self.weeks.len() as i64;
        let score = if self.achieved() {
            (100 - weeks * 5).max(60)
        } else if self.goal > 0.0 {
            (self.total_saved() / self.goal * 50.0).floor() as i64
        } else {
            0
        };
        score.clamp(0, 100) as u8
    }
}

impl Default for SavingsChallenge {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for SavingsChallenge {
    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn result(&self) -> Option<ScoreResult> {
        (self.phase == SavingsPhase::Finished)
            .then(|| ScoreResult::assessed(self.weeks.len() as u32, self.score()))
    }
}
