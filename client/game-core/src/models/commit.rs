use super::{
    BadgeId, MergeEffect, ModuleId, ProgressSnapshot, RewardGrant, ScoreResult, UserId, UserProfile,
};
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How a game turns its final score into coins and XP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RewardPolicy {
    Flat(RewardGrant),
    CorrectThreshold {
        min_correct: u32,
        met: RewardGrant,
        missed: RewardGrant,
    },
    PercentageThreshold {
        min_percentage: u8,
        met: RewardGrant,
        missed: RewardGrant,
    },
}

impl RewardPolicy {
    pub fn grant(&self, score: &ScoreResult) -> RewardGrant {
        match *self {
            RewardPolicy::Flat(grant) => grant,
            RewardPolicy::CorrectThreshold {
                min_correct,
                met,
                missed,
            } => {
                if score.correct >= min_correct {
                    met
                } else {
                    missed
                }
            }
            RewardPolicy::PercentageThreshold {
                min_percentage,
                met,
                missed,
            } => {
                if score.percentage >= min_percentage {
                    met
                } else {
                    missed
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTrigger {
    /// First completion of the module itself
    ModuleCompleted,
    /// The player's completed-module count reaches exactly this value
    CompletedCount(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRule {
    pub badge: BadgeId,
    pub trigger: BadgeTrigger,
}

impl BadgeRule {
    pub fn on_completion(badge: &str) -> Self {
        Self {
            badge: BadgeId::new(badge),
            trigger: BadgeTrigger::ModuleCompleted,
        }
    }

    pub fn at_count(badge: &str, count: usize) -> Self {
        Self {
            badge: BadgeId::new(badge),
            trigger: BadgeTrigger::CompletedCount(count),
        }
    }

    /// Only meaningful for a commit that newly completed its module.
    pub fn fires(&self, completed_count: usize) -> bool {
        match self.trigger {
            BadgeTrigger::ModuleCompleted => true,
            BadgeTrigger::CompletedCount(target) => completed_count == target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStep {
    AddCoins,
    AddXp,
    FetchProgress,
    UpdateProgress,
    UnlockBadge,
}

impl CommitStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStep::AddCoins => "add_coins",
            CommitStep::AddXp => "add_xp",
            CommitStep::FetchProgress => "get_progress",
            CommitStep::UpdateProgress => "update_progress",
            CommitStep::UnlockBadge => "unlock_badge",
        }
    }
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpEvent {
    pub new_level: u32,
    pub bonus_coins: u64,
}

/// One "Complete" action. Keep the same request across retries: it remembers
/// which reward halves were already granted so a retry never pays twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    /// Correlates every attempt of one commit in the logs
    pub id: Uuid,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub score: ScoreResult,
    pub reward: RewardGrant,
    pub badge_rules: Vec<BadgeRule>,
    coins_settled: bool,
    xp_settled: bool,
    newly_completed: bool,
    pending_badges: Option<Vec<BadgeId>>,
    applied: Vec<CommitStep>,
    level_up: Option<LevelUpEvent>,
}

impl CommitRequest {
    pub fn new(
        user_id: UserId,
        module_id: ModuleId,
        score: ScoreResult,
        reward: RewardGrant,
        badge_rules: Vec<BadgeRule>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            module_id,
            score,
            reward,
            badge_rules,
            coins_settled: false,
            xp_settled: false,
            newly_completed: false,
            pending_badges: None,
            applied: Vec::new(),
            level_up: None,
        }
    }

    pub fn coins_settled(&self) -> bool {
        self.coins_settled
    }

    pub fn xp_settled(&self) -> bool {
        self.xp_settled
    }

    pub fn rewards_settled(&self) -> bool {
        self.coins_settled && self.xp_settled
    }

    /// Steps that changed server state, across every attempt, in order.
    pub fn applied_steps(&self) -> &[CommitStep] {
        &self.applied
    }

    pub fn pending_badges(&self) -> &[BadgeId] {
        self.pending_badges.as_deref().unwrap_or(&[])
    }

    pub fn level_up(&self) -> Option<LevelUpEvent> {
        self.level_up
    }

    pub(crate) fn settle_coins(&mut self, applied: bool) {
        self.coins_settled = true;
        if applied {
            self.applied.push(CommitStep::AddCoins);
        }
    }

    pub(crate) fn settle_xp(&mut self, applied: bool, level_up: Option<LevelUpEvent>) {
        self.xp_settled = true;
        if applied {
            self.applied.push(CommitStep::AddXp);
        }
        if level_up.is_some() {
            self.level_up = level_up;
        }
    }

    pub(crate) fn record_progress_update(&mut self) {
        self.applied.push(CommitStep::UpdateProgress);
    }

    /// Badge rules are evaluated once, against the commit that first completed the module.
    /// A retry after the progress write landed sees the module as already completed,
    /// so the earlier evaluation has to survive in the request.
    pub(crate) fn record_merge(&mut self, effect: MergeEffect, completed_count: usize) {
        if effect == MergeEffect::NewlyCompleted && self.pending_badges.is_none() {
            self.newly_completed = true;
            self.pending_badges = Some(
                self.badge_rules
                    .iter()
                    .filter(|rule| rule.fires(completed_count))
                    .map(|rule| rule.badge.clone())
                    .collect(),
            );
        }
    }

    pub(crate) fn newly_completed(&self) -> bool {
        self.newly_completed
    }

    pub(crate) fn settle_badge(&mut self, badge: &BadgeId, applied: bool) {
        if let Some(pending) = self.pending_badges.as_mut() {
            pending.retain(|b| b != badge);
        }
        if applied {
            self.applied.push(CommitStep::UnlockBadge);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommitFailureKind {
    /// Nothing reached the server; a retry starts from scratch.
    NetworkFailure,
    /// At least one earlier step changed server state before the failure.
    PartialCommit,
}

#[derive(Debug)]
pub struct CommitFailure {
    pub step: CommitStep,
    pub kind: CommitFailureKind,
    pub error: ApiError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    pub module_id: ModuleId,
    pub score: ScoreResult,
    pub merge: MergeEffect,
    pub snapshot: ProgressSnapshot,
    /// Cached profile after the commit, when the committing user is signed in
    pub profile: Option<UserProfile>,
    pub level_up: Option<LevelUpEvent>,
    pub unlocked_badges: Vec<BadgeId>,
}

#[derive(Debug)]
pub enum CommitOutcome {
    Committed(CommitReceipt),
    Failed(CommitFailure),
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }

    pub fn receipt(&self) -> Option<&CommitReceipt> {
        match self {
            CommitOutcome::Committed(receipt) => Some(receipt),
            CommitOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&CommitFailure> {
        match self {
            CommitOutcome::Committed(_) => None,
            CommitOutcome::Failed(failure) => Some(failure),
        }
    }
}
