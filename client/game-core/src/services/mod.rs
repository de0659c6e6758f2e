use crate::config::Config;
use crate::services::auth_service::AuthService;
use crate::services::profile_store::ProfileStore;
use crate::services::progress_client::{HttpApiClient, RemoteProgressClient};
use crate::services::progress_committer::ProgressCommitter;
use crate::services::storage::{FileStore, KeyValueStore};
use std::sync::Arc;

/// Everything a front end needs to run games for one player
pub struct AppState {
    pub config: Config,
    pub api: Arc<HttpApiClient>,
    pub profile: ProfileStore,
    pub storage: Arc<dyn KeyValueStore>,
    pub committer: Arc<ProgressCommitter>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir.clone()));
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn KeyValueStore>) -> Self {
        tracing::info!(
            "Using API at {} (timeout {:?})",
            config.api_url,
            config.request_timeout
        );

        let api = Arc::new(HttpApiClient::new(
            config.api_url.clone(),
            config.request_timeout,
        ));
        let profile = ProfileStore::new();
        let remote: Arc<dyn RemoteProgressClient> = api.clone();
        let committer = Arc::new(ProgressCommitter::new(remote, profile.clone()));
        let auth = AuthService::new(api.clone(), profile.clone(), storage.clone());

        Self {
            config,
            api,
            profile,
            storage,
            committer,
            auth,
        }
    }
}

pub mod auth_service;
pub mod profile_store;
pub mod progress_client;
pub mod progress_committer;
pub mod round_engine;
pub mod storage;
