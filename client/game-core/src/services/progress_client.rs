use crate::error::ApiError;
use crate::metrics::track_api_call;
use crate::models::api::{
    AddCoinsRequest, AddCoinsResponse, AddXpRequest, AddXpResponse, ErrorBody, LoginRequest,
    ModuleInfo, RegisterRequest, UnlockBadgeRequest, UnlockBadgeResponse, UpdateLevelRequest,
    UpdateProgressResponse, UserResponse,
};
use crate::models::{BadgeId, EducationLevel, ProgressSnapshot, UserId, UserProfile};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGrant {
    pub new_xp: u64,
    pub new_level: u32,
    pub leveled_up: bool,
    pub bonus_coins: u64,
    /// Coin balance after any level-up bonus was paid
    pub total_coins: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeUnlock {
    pub is_new: bool,
}

/// Network operations the commit protocol depends on. Every call may fail;
/// implementations never retry on their own.
#[async_trait]
pub trait RemoteProgressClient: Send + Sync {
    /// Returns the new coin total.
    async fn add_coins(&self, user_id: &UserId, amount: u64) -> Result<u64, ApiError>;

    async fn add_xp(&self, user_id: &UserId, amount: u64) -> Result<XpGrant, ApiError>;

    /// A user without a progress document yields an empty snapshot.
    async fn get_progress(&self, user_id: &UserId) -> Result<ProgressSnapshot, ApiError>;

    async fn update_progress(&self, snapshot: &ProgressSnapshot) -> Result<bool, ApiError>;

    async fn unlock_badge(&self, user_id: &UserId, badge: &BadgeId) -> Result<BadgeUnlock, ApiError>;
}

/// reqwest client for the game's REST API
#[derive(Clone)]
pub struct HttpApiClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpApiClient {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, operation: &'static str, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidResponse {
                operation,
                reason: format!("cannot build URL for {}: {}", path, e),
            })
    }

    /// Sends one request bounded by the configured timeout, maps non-2xx to
    /// `ApiError::Status` and validates the decoded body.
    async fn call<B, T>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Validate,
    {
        let url = self.endpoint(operation, path)?;
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|source| ApiError::Transport { operation, source })?;

            let status = response.status();
            if !status.is_success() {
                let detail = match response.json::<ErrorBody>().await {
                    Ok(body) => body.message(),
                    Err(_) => status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string(),
                };
                return Err(ApiError::Status {
                    operation,
                    status: status.as_u16(),
                    detail,
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|source| ApiError::Transport { operation, source })?;
            let parsed: T =
                serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse {
                    operation,
                    reason: e.to_string(),
                })?;
            parsed.validate().map_err(|e| ApiError::InvalidResponse {
                operation,
                reason: e.to_string(),
            })?;
            Ok::<T, ApiError>(parsed)
        };

        let timed = async {
            match tokio::time::timeout(self.timeout, exchange).await {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout {
                    operation,
                    timeout: self.timeout,
                }),
            }
        };

        let result = track_api_call(operation, timed).await;
        if let Err(e) = &result {
            tracing::warn!("API call failed: {}", e);
        }
        result
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        let user: UserResponse = self
            .call("register", Method::POST, "api/auth/register", Some(request))
            .await?;
        Ok(user.into())
    }

    pub async fn login(&self, username: &str) -> Result<UserProfile, ApiError> {
        let request = LoginRequest {
            username: username.to_string(),
        };
        let user: UserResponse = self
            .call("login", Method::POST, "api/auth/login", Some(&request))
            .await?;
        Ok(user.into())
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ApiError> {
        let path = format!("api/user/{}", user_id);
        let user: UserResponse = self
            .call::<(), _>("get_user", Method::GET, &path, None)
            .await?;
        Ok(user.into())
    }

    pub async fn update_user_level(
        &self,
        user_id: &UserId,
        level: EducationLevel,
    ) -> Result<UserProfile, ApiError> {
        let request = UpdateLevelRequest { user_id, level };
        let user: UserResponse = self
            .call("update_level", Method::PUT, "api/user/level", Some(&request))
            .await?;
        Ok(user.into())
    }

    pub async fn modules_by_level(&self, level: EducationLevel) -> Result<Vec<ModuleInfo>, ApiError> {
        let path = format!("api/modules/{}", level);
        let modules: ModuleList = self
            .call::<(), _>("modules_by_level", Method::GET, &path, None)
            .await?;
        Ok(modules.0)
    }
}

/// The module catalogue is a bare JSON array; validated item by item.
#[derive(serde::Deserialize)]
#[serde(transparent)]
struct ModuleList(Vec<ModuleInfo>);

impl Validate for ModuleList {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.0.iter().try_for_each(|module| module.validate())
    }
}

fn rejected(operation: &'static str) -> ApiError {
    ApiError::InvalidResponse {
        operation,
        reason: "server answered success=false".to_string(),
    }
}

#[async_trait]
impl RemoteProgressClient for HttpApiClient {
    async fn add_coins(&self, user_id: &UserId, amount: u64) -> Result<u64, ApiError> {
        let request = AddCoinsRequest {
            user_id,
            coins: amount,
        };
        let response: AddCoinsResponse = self
            .call("add_coins", Method::POST, "api/coins/add", Some(&request))
            .await?;
        if !response.success {
            return Err(rejected("add_coins"));
        }
        Ok(response.new_total)
    }

    async fn add_xp(&self, user_id: &UserId, amount: u64) -> Result<XpGrant, ApiError> {
        let request = AddXpRequest { user_id, xp: amount };
        let response: AddXpResponse = self
            .call("add_xp", Method::POST, "api/xp/add", Some(&request))
            .await?;
        if !response.success {
            return Err(rejected("add_xp"));
        }
        Ok(XpGrant {
            new_xp: response.new_xp,
            new_level: response.new_level,
            leveled_up: response.level_up,
            bonus_coins: response.bonus_coins,
            total_coins: response.total_coins,
        })
    }

    async fn get_progress(&self, user_id: &UserId) -> Result<ProgressSnapshot, ApiError> {
        let path = format!("api/progress/{}", user_id);
        match self
            .call::<(), ProgressSnapshot>("get_progress", Method::GET, &path, None)
            .await
        {
            Ok(snapshot) if snapshot.user_id != *user_id => Err(ApiError::InvalidResponse {
                operation: "get_progress",
                reason: format!("progress belongs to {}", snapshot.user_id),
            }),
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_not_found() => {
                tracing::info!("No progress stored for {}, starting empty", user_id);
                Ok(ProgressSnapshot::empty(user_id.clone()))
            }
            Err(e) => Err(e),
        }
    }

    async fn update_progress(&self, snapshot: &ProgressSnapshot) -> Result<bool, ApiError> {
        let response: UpdateProgressResponse = self
            .call(
                "update_progress",
                Method::POST,
                "api/progress/update",
                Some(snapshot),
            )
            .await?;
        if !response.success {
            return Err(rejected("update_progress"));
        }
        Ok(response.modified || response.created)
    }

    async fn unlock_badge(&self, user_id: &UserId, badge: &BadgeId) -> Result<BadgeUnlock, ApiError> {
        let request = UnlockBadgeRequest {
            user_id,
            badge_id: badge,
        };
        let response: UnlockBadgeResponse = self
            .call("unlock_badge", Method::POST, "api/badges/unlock", Some(&request))
            .await?;
        if !response.success {
            return Err(rejected("unlock_badge"));
        }
        Ok(BadgeUnlock {
            is_new: response.new_badge,
        })
    }
}
