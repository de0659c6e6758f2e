use crate::models::api::{ModuleInfo, RegisterRequest};
use crate::models::{EducationLevel, UserProfile};
use crate::services::profile_store::ProfileStore;
use crate::services::progress_client::HttpApiClient;
use crate::services::storage::{KeyValueStore, SELECTED_LEVEL_KEY, USER_KEY};
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

/// Sign-in, session restore and level selection for the local player.
///
/// Accounts are username-only; the backend does not issue tokens.
pub struct AuthService {
    api: Arc<HttpApiClient>,
    profile: ProfileStore,
    storage: Arc<dyn KeyValueStore>,
    refresh_retry: RetryConfig,
}

impl AuthService {
    pub fn new(api: Arc<HttpApiClient>, profile: ProfileStore, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            profile,
            storage,
            refresh_retry: RetryConfig::default(),
        }
    }

    pub fn with_refresh_retry(mut self, config: RetryConfig) -> Self {
        self.refresh_retry = config;
        self
    }

    /// Register a new player
    pub async fn register(&self, username: &str, age: u32) -> Result<UserProfile> {
        let request = RegisterRequest {
            username: username.trim().to_string(),
            age,
            avatar_config: Value::Object(Default::default()),
        };
        request
            .validate()
            .map_err(|e| anyhow!("Invalid registration: {}", e))?;

        let profile = self
            .api
            .register(&request)
            .await
            .context("Failed to register user")?;

        tracing::info!("User registered: {}", profile.username);
        self.sign_in(profile).await
    }

    pub async fn login(&self, username: &str) -> Result<UserProfile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(anyhow!("Username is required"));
        }

        let profile = self.api.login(username).await.context("Failed to log in")?;
        tracing::info!("User logged in: {}", profile.username);
        self.sign_in(profile).await
    }

    async fn sign_in(&self, profile: UserProfile) -> Result<UserProfile> {
        self.profile.set_user(profile.clone());
        self.persist_profile().await?;
        Ok(profile)
    }

    /// Loads the stored profile and refreshes it from the server.
    ///
    /// An unreachable server keeps the cached copy; a user the server no
    /// longer knows ends the session.
    pub async fn restore_session(&self) -> Result<Option<UserProfile>> {
        let Some(cached) = self
            .profile
            .restore(self.storage.as_ref())
            .await
            .context("Failed to read stored profile")?
        else {
            return Ok(None);
        };

        let api = Arc::clone(&self.api);
        let user_id = cached.id.clone();
        let refreshed = retry_async_with_config(self.refresh_retry.clone(), "get_user", || {
            let api = Arc::clone(&api);
            let user_id = user_id.clone();
            async move { api.get_user(&user_id).await }
        })
        .await;

        match refreshed {
            Ok(profile) => {
                tracing::info!("Session restored for {}", profile.username);
                self.sign_in(profile).await.map(Some)
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Stored user {} no longer exists, signing out", cached.id);
                self.logout().await?;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Could not refresh profile, using cached copy: {}", e);
                Ok(Some(cached))
            }
        }
    }

    /// Stores the education level server-side and locally.
    pub async fn select_level(&self, level: EducationLevel) -> Result<UserProfile> {
        let current = self
            .profile
            .current()
            .ok_or_else(|| anyhow!("No user signed in"))?;

        let updated = self
            .api
            .update_user_level(&current.id, level)
            .await
            .context("Failed to update education level")?;

        self.profile.set_selected_level(updated.selected_level);
        self.storage
            .set(SELECTED_LEVEL_KEY, updated.selected_level.as_str())
            .await
            .context("Failed to store selected level")?;
        self.persist_profile().await?;

        tracing::info!("{} selected level {}", current.username, updated.selected_level);
        self.profile
            .current()
            .ok_or_else(|| anyhow!("Signed out while selecting level"))
    }

    /// Last level picked on this device, if any.
    pub async fn stored_level(&self) -> Result<Option<EducationLevel>> {
        let raw = self
            .storage
            .get(SELECTED_LEVEL_KEY)
            .await
            .context("Failed to read selected level")?;
        Ok(raw.map(|value| EducationLevel::normalize(&value)))
    }

    pub async fn logout(&self) -> Result<()> {
        self.profile.clear();
        self.storage
            .remove(USER_KEY)
            .await
            .context("Failed to remove stored profile")?;
        self.storage
            .remove(SELECTED_LEVEL_KEY)
            .await
            .context("Failed to remove selected level")?;
        Ok(())
    }

    pub async fn persist_profile(&self) -> Result<()> {
        self.profile
            .persist(self.storage.as_ref())
            .await
            .context("Failed to persist profile")
    }

    /// Module catalogue for the signed-in player's level.
    pub async fn available_modules(&self) -> Result<Vec<ModuleInfo>> {
        let level = self
            .profile
            .current()
            .map(|profile| profile.selected_level)
            .unwrap_or_default();
        self.api
            .modules_by_level(level)
            .await
            .with_context(|| format!("Failed to load modules for level {}", level))
    }
}
