use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use validator::{Validate, ValidationError};

pub mod api;
pub mod commit;
pub mod game;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Server-side user identifier (a Mongo ObjectId in hex form)
    UserId
);
string_id!(
    /// Key of a mini-game in the progress document, e.g. `coin_recognition`
    ModuleId
);
string_id!(BadgeId);

/// Educational stage chosen on the level-select screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EducationLevel {
    #[default]
    Inicial,
    Primaria,
    Secundaria,
}

impl EducationLevel {
    /// Unknown or empty values fall back to `inicial`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "primaria" => EducationLevel::Primaria,
            "secundaria" => EducationLevel::Secundaria,
            _ => EducationLevel::Inicial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::Inicial => "inicial",
            EducationLevel::Primaria => "primaria",
            EducationLevel::Secundaria => "secundaria",
        }
    }
}

impl From<String> for EducationLevel {
    fn from(value: String) -> Self {
        EducationLevel::normalize(&value)
    }
}

impl From<EducationLevel> for String {
    fn from(value: EducationLevel) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_player_level() -> u32 {
    1
}

/// Authenticated player as cached by the profile store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserProfile {
    pub id: UserId,
    #[validate(length(min = 1))]
    pub username: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub xp: u64,
    #[serde(default = "default_player_level")]
    #[validate(range(min = 1))]
    pub level: u32,
    #[serde(default)]
    pub badges: BTreeSet<BadgeId>,
    #[serde(default)]
    pub selected_level: EducationLevel,
}

/// Final result of one played session. Derived once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryTier {
    Perfect,
    Good,
    KeepTrying,
}

impl ScoreResult {
    /// `percentage = round(correct * 100 / total)`, halves rounded up.
    /// A zero total yields 0%; the round engine never produces one.
    pub fn from_counts(correct: u32, total: u32) -> Self {
        let correct = correct.min(total);
        let percentage = if total == 0 {
            0
        } else {
            let (c, t) = (u64::from(correct), u64::from(total));
            ((c * 200 + t) / (2 * t)) as u8
        };
        Self {
            correct,
            total,
            percentage,
        }
    }

    /// Score for simulations that grade on their own scale instead of counting right answers.
    pub fn assessed(total: u32, percentage: u8) -> Self {
        let percentage = percentage.min(100);
        let correct = ((u64::from(percentage) * u64::from(total) + 50) / 100) as u32;
        Self {
            correct,
            total,
            percentage,
        }
    }

    pub fn tier(&self) -> SummaryTier {
        match self.percentage {
            100 => SummaryTier::Perfect,
            50..=99 => SummaryTier::Good,
            _ => SummaryTier::KeepTrying,
        }
    }
}

/// Coins and XP handed out for one finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardGrant {
    pub coins: u64,
    pub xp: u64,
}

impl RewardGrant {
    pub const fn new(coins: u64, xp: u64) -> Self {
        Self { coins, xp }
    }
}

/// Result of folding a new percentage into a progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    NewlyCompleted,
    Improved { previous: u8 },
    Unchanged { best: u8 },
}

impl MergeEffect {
    pub fn changed(&self) -> bool {
        !matches!(self, MergeEffect::Unchanged { .. })
    }
}

fn validate_module_scores(scores: &BTreeMap<ModuleId, u8>) -> Result<(), ValidationError> {
    if scores.values().any(|score| *score > 100) {
        return Err(ValidationError::new("module_score_out_of_range"));
    }
    Ok(())
}

/// Accepts RFC 3339 as well as the naive timestamps Mongo hands back; anything else is dropped.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

/// Server-owned progress document. The local copy is only ever the last successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProgressSnapshot {
    pub user_id: UserId,
    #[serde(default)]
    pub completed_modules: BTreeSet<ModuleId>,
    #[serde(default)]
    #[validate(custom(function = "validate_module_scores"))]
    pub module_scores: BTreeMap<ModuleId, u8>,
    #[serde(default)]
    pub total_score: u32,
    #[serde(default, skip_serializing, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            completed_modules: BTreeSet::new(),
            module_scores: BTreeMap::new(),
            total_score: 0,
            updated_at: None,
        }
    }

    pub fn best_score(&self, module: &ModuleId) -> Option<u8> {
        self.module_scores.get(module).copied()
    }

    pub fn is_consistent(&self) -> bool {
        self.module_scores
            .keys()
            .all(|module| self.completed_modules.contains(module))
            && self.total_score == self.scores_sum()
    }

    /// Restores `scores ⊆ completed` and `total == Σ scores` on documents written by older
    /// clients. A scored module is treated as completed. Returns whether anything changed.
    pub fn reconcile(&mut self) -> bool {
        if self.is_consistent() {
            return false;
        }
        for module in self.module_scores.keys() {
            self.completed_modules.insert(module.clone());
        }
        self.total_score = self.scores_sum();
        true
    }

    /// Best score wins. A completed module is only touched when the new percentage is
    /// strictly higher; `total_score` moves by the delta.
    pub fn merge_score(&mut self, module: &ModuleId, percentage: u8) -> MergeEffect {
        let percentage = percentage.min(100);
        if !self.completed_modules.contains(module) {
            self.completed_modules.insert(module.clone());
            let previous = self.module_scores.insert(module.clone(), percentage);
            self.total_score = self
                .total_score
                .saturating_sub(previous.map(u32::from).unwrap_or(0))
                + u32::from(percentage);
            return MergeEffect::NewlyCompleted;
        }

        match self.module_scores.get(module).copied() {
            Some(best) if percentage <= best => MergeEffect::Unchanged { best },
            previous => {
                let previous = previous.unwrap_or(0);
                self.module_scores.insert(module.clone(), percentage);
                self.total_score =
                    self.total_score.saturating_sub(u32::from(previous)) + u32::from(percentage);
                MergeEffect::Improved { previous }
            }
        }
    }

    fn scores_sum(&self) -> u32 {
        self.module_scores.values().map(|s| u32::from(*s)).sum()
    }
}
