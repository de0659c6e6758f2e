//! Wire schemas of the REST API. One request and one response type per
//! operation; responses are validated before anything reaches the core.

use super::{BadgeId, EducationLevel, UserId, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct AddCoinsRequest<'a> {
    pub user_id: &'a UserId,
    pub coins: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddCoinsResponse {
    pub success: bool,
    pub new_total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddXpRequest<'a> {
    pub user_id: &'a UserId,
    pub xp: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddXpResponse {
    pub success: bool,
    pub new_xp: u64,
    #[validate(range(min = 1))]
    pub new_level: u32,
    pub level_up: bool,
    #[serde(default)]
    pub bonus_coins: u64,
    pub total_coins: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProgressResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlockBadgeRequest<'a> {
    pub user_id: &'a UserId,
    pub badge_id: &'a BadgeId,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UnlockBadgeResponse {
    pub success: bool,
    pub new_badge: bool,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 40))]
    pub username: String,
    #[validate(range(min = 1, max = 120))]
    pub age: u32,
    pub avatar_config: Value,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 40))]
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateLevelRequest<'a> {
    pub user_id: &'a UserId,
    pub level: EducationLevel,
}

/// Account document as the server returns it. Shop fields are accepted and ignored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserResponse {
    pub id: UserId,
    #[validate(length(min = 1))]
    pub username: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub xp: u64,
    #[validate(range(min = 1))]
    pub level: u32,
    #[serde(default)]
    pub badges: BTreeSet<BadgeId>,
    #[serde(default)]
    pub selected_level: Option<EducationLevel>,
}

impl From<UserResponse> for UserProfile {
    fn from(user: UserResponse) -> Self {
        UserProfile {
            id: user.id,
            username: user.username,
            age: user.age,
            coins: user.coins,
            xp: user.xp,
            level: user.level,
            badges: user.badges,
            selected_level: user.selected_level.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ModuleInfo {
    #[validate(length(min = 1))]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub coins_reward: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub level: EducationLevel,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
