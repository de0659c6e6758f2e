use super::{GameDefinition, Simulation};
use crate::error::EngineError;
use crate::models::commit::{BadgeRule, RewardPolicy};
use crate::models::{RewardGrant, ScoreResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const INITIAL_MONEY: f64 = 20.0;
pub const TOTAL_DAYS: u32 = 5;
const XP_REWARD: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEvent {
    Normal,
    Sunny,
    Rainy,
    Competition,
    SpecialCustomer,
}

impl DayEvent {
    /// Day one is always normal; later days roll for weather and surprises.
    pub fn roll(day: u32, roll: f64) -> Self {
        if day <= 1 {
            return DayEvent::Normal;
        }
        match roll {
            r if r < 0.2 => DayEvent::Sunny,
            r if r < 0.35 => DayEvent::Rainy,
            r if r < 0.5 => DayEvent::Competition,
            r if r < 0.6 => DayEvent::SpecialCustomer,
            _ => DayEvent::Normal,
        }
    }

    pub fn sales_modifier(&self) -> f64 {
        match self {
            DayEvent::Sunny => 1.2,
            DayEvent::Rainy => 0.7,
            DayEvent::Competition => 0.85,
            DayEvent::SpecialCustomer | DayEvent::Normal => 1.0,
        }
    }

    pub fn bonus(&self) -> f64 {
        match self {
            DayEvent::SpecialCustomer => 10.0,
            _ => 0.0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DayEvent::Normal => "Un día típico para vender limonada",
            DayEvent::Sunny => "Hace calor, la gente tiene sed. +20% en ventas",
            DayEvent::Rainy => "Está lloviendo, menos clientes. -30% en ventas",
            DayEvent::Competition => "Otro puesto abrió cerca. -15% en ventas",
            DayEvent::SpecialCustomer => "¡Un cliente compró mucho! +$10 extra",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayRecord {
    pub day: u32,
    pub event: DayEvent,
    pub investment: f64,
    pub expected_revenue: f64,
    pub revenue: f64,
    pub profit: f64,
    pub money_after: f64,
}

/// Five days running a lemonade stand: invest, guess the sales, let the day's
/// event decide what actually sells.
#[derive(Debug, Clone)]
pub struct LemonadeStand {
    definition: GameDefinition,
    rng: StdRng,
    money: f64,
    today: Option<DayEvent>,
    days: Vec<DayRecord>,
}

impl LemonadeStand {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            definition: GameDefinition::new(
                "lemonade_stand",
                "Puesto de limonada",
                TOTAL_DAYS as usize,
                0,
            )
            .with_reward(RewardPolicy::Flat(RewardGrant::new(0, XP_REWARD)))
            .with_badge(BadgeRule::at_count("first_module", 1))
            .with_badge(BadgeRule::on_completion("lemonade_master")),
            rng,
            money: INITIAL_MONEY,
            today: None,
            days: Vec::new(),
        }
    }

    pub fn current_day(&self) -> u32 {
        self.days.len() as u32 + 1
    }

    pub fn money(&self) -> f64 {
        self.money
    }

    pub fn days(&self) -> &[DayRecord] {
        &self.days
    }

    pub fn is_finished(&self) -> bool {
        self.days.len() as u32 >= TOTAL_DAYS
    }

    /// Event of the day being played. Rolled once per day and then kept.
    pub fn todays_event(&mut self) -> Option<DayEvent> {
        if self.is_finished() {
            return None;
        }
        if self.today.is_none() {
            let roll: f64 = self.rng.random();
            self.today = Some(DayEvent::roll(self.current_day(), roll));
        }
        self.today
    }

    pub fn play_day(&mut self, investment: f64, expected_revenue: f64) -> Result<DayRecord, EngineError> {
        let event = self
            .todays_event()
            .ok_or_else(|| EngineError::InvalidMove("the stand is closed".to_string()))?;

        if !investment.is_finite() || investment <= 0.0 {
            return Err(EngineError::InvalidMove("investment must be positive".to_string()));
        }
        if investment > self.money {
            return Err(EngineError::InvalidMove(format!(
                "cannot invest more than the {:.2} available",
                self.money
            )));
        }
        if !expected_revenue.is_finite() || expected_revenue <= 0.0 {
            return Err(EngineError::InvalidMove("expected sales must be positive".to_string()));
        }

        let revenue = expected_revenue * event.sales_modifier() + event.bonus();
        self.money = self.money - investment + revenue;
        let record = DayRecord {
            day: self.current_day(),
            event,
            investment,
            expected_revenue,
            revenue,
            profit: revenue - investment,
            money_after: self.money,
        };
        self.days.push(record);
        self.today = None;
        Ok(record)
    }

    pub fn total_profit(&self) -> f64 {
        self.days.iter().map(|d| d.profit).sum()
    }

    pub fn profit_margin(&self) -> f64 {
        (self.money - INITIAL_MONEY) / INITIAL_MONEY * 100.0
    }

    pub fn score(&self) -> u8 {
        match self.profit_margin() {
            m if m >= 100.0 => 100,
            m if m >= 75.0 => 90,
            m if m >= 50.0 => 80,
            m if m >= 25.0 => 70,
            m if m >= 10.0 => 60,
            _ => 50,
        }
    }
}

impl Default for LemonadeStand {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for LemonadeStand {
    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn result(&self) -> Option<ScoreResult> {
        self.is_finished()
            .then(|| ScoreResult::assessed(TOTAL_DAYS, self.score()))
    }

    /// Coins are whatever cash is left in the till.
    fn reward(&self, _score: &ScoreResult) -> RewardGrant {
        RewardGrant::new(self.money.max(0.0).floor() as u64, XP_REWARD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stand() -> LemonadeStand {
        LemonadeStand::with_rng(StdRng::seed_from_u64(5))
    }

    #[test]
    fn event_table() {
        assert_eq!(DayEvent::roll(1, 0.01), DayEvent::Normal);
        assert_eq!(DayEvent::roll(2, 0.1), DayEvent::Sunny);
        assert_eq!(DayEvent::roll(2, 0.2), DayEvent::Rainy);
        assert_eq!(DayEvent::roll(3, 0.4), DayEvent::Competition);
        assert_eq!(DayEvent::roll(4, 0.55), DayEvent::SpecialCustomer);
        assert_eq!(DayEvent::roll(5, 0.9), DayEvent::Normal);
    }

    #[test]
    fn first_day_is_normal_and_updates_cash() {
        let mut game = stand();
        assert_eq!(game.todays_event(), Some(DayEvent::Normal));
        let day = game.play_day(10.0, 25.0).unwrap();
        assert!((day.revenue - 25.0).abs() < 1e-9);
        assert!((game.money() - 35.0).abs() < 1e-9);
        assert_eq!(game.current_day(), 2);
    }

    #[test]
    fn rejects_invalid_investments() {
        let mut game = stand();
        assert!(game.play_day(0.0, 10.0).is_err());
        assert!(game.play_day(25.0, 10.0).is_err());
        assert!(game.play_day(5.0, 0.0).is_err());
        assert!(game.days().is_empty());
    }

    #[test]
    fn five_days_finish_the_game() {
        let mut game = stand();
        for _ in 0..TOTAL_DAYS {
            assert!(game.result().is_none());
            let invest = game.money().min(5.0);
            game.play_day(invest, 20.0).unwrap();
        }
        assert!(game.is_finished());
        assert!(game.play_day(1.0, 1.0).is_err());

        let result = game.result().unwrap();
        assert_eq!(result.total, TOTAL_DAYS);
        let reward = game.reward(&result);
        assert_eq!(reward.coins, game.money().floor() as u64);
        assert_eq!(reward.xp, 100);
    }

    #[test]
    fn score_follows_profit_margin() {
        let mut game = stand();
        game.money = 40.0;
        assert_eq!(game.score(), 100);
        game.money = 35.0;
        assert_eq!(game.score(), 90);
        game.money = 30.0;
        assert_eq!(game.score(), 80);
        game.money = 25.0;
        assert_eq!(game.score(), 70);
        game.money = 22.0;
        assert_eq!(game.score(), 60);
        game.money = 12.0;
        assert_eq!(game.score(), 50);
    }
}
