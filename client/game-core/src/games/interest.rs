use super::{GameDefinition, Simulation};
use crate::error::EngineError;
use crate::models::commit::RewardPolicy;
use crate::models::{RewardGrant, ScoreResult};

const MAX_YEARS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearRow {
    pub year: u32,
    pub interest: f64,
    pub balance: f64,
}

/// Yearly schedule of simple interest: `p * r * year` on the original principal.
pub fn simple_schedule(principal: f64, rate: f64, years: u32) -> Vec<YearRow> {
    (1..=years)
        .map(|year| {
            let interest = principal * rate * f64::from(year);
            YearRow {
                year,
                interest,
                balance: principal + interest,
            }
        })
        .collect()
}

/// Yearly schedule of annually compounded interest: `p * (1 + r)^year`.
pub fn compound_schedule(principal: f64, rate: f64, years: u32) -> Vec<YearRow> {
    (1..=years)
        .map(|year| {
            let balance = principal * (1.0 + rate).powi(year as i32);
            YearRow {
                year,
                interest: balance - principal,
                balance,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct InterestCalculator {
    definition: GameDefinition,
    simple: Vec<YearRow>,
    compound: Vec<YearRow>,
    inputs: Option<(f64, f64, u32)>,
}

impl InterestCalculator {
    pub fn new() -> Self {
        Self {
            definition: GameDefinition::new("simple_interest", "Interés simple", 1, 0)
                .with_reward(RewardPolicy::Flat(RewardGrant::new(40, 80))),
            simple: Vec::new(),
            compound: Vec::new(),
            inputs: None,
        }
    }

    /// `rate_percent` is given the way players type it, e.g. `5` for 5%.
    pub fn calculate(&mut self, principal: f64, rate_percent: f64, years: u32) -> Result<&[YearRow], EngineError> {
        if !principal.is_finite() || principal <= 0.0 {
            return Err(EngineError::InvalidMove("principal must be positive".to_string()));
        }
        if !rate_percent.is_finite() || rate_percent <= 0.0 {
            return Err(EngineError::InvalidMove("rate must be positive".to_string()));
        }
        if years == 0 || years > MAX_YEARS {
            return Err(EngineError::InvalidMove(format!(
                "years must be between 1 and {}",
                MAX_YEARS
            )));
        }
        let rate = rate_percent / 100.0;
        self.inputs = Some((principal, rate, years));
        self.simple = simple_schedule(principal, rate, years);
        self.compound.clear();
        Ok(&self.simple)
    }

    /// Shows the compound schedule for the last calculation. Viewing it completes the lesson.
    pub fn compare(&mut self) -> Result<&[YearRow], EngineError> {
        let (principal, rate, years) = self
            .inputs
            .ok_or_else(|| EngineError::InvalidMove("calculate simple interest first".to_string()))?;
        self.compound = compound_schedule(principal, rate, years);
        Ok(&self.compound)
    }

    /// How much more compounding earns by the last year
    pub fn difference(&self) -> Option<f64> {
        match (self.simple.last(), self.compound.last()) {
            (Some(simple), Some(compound)) => Some(compound.balance - simple.balance),
            _ => None,
        }
    }
}

impl Default for InterestCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for InterestCalculator {
    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn result(&self) -> Option<ScoreResult> {
        (!self.compound.is_empty()).then(|| ScoreResult::assessed(1, 100))
    }
}
