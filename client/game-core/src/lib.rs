pub mod config;
pub mod error;
pub mod games;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, EngineError, StorageError};
pub use services::progress_committer::{CommitHandle, ProgressCommitter};
pub use services::round_engine::RoundEngine;
pub use services::AppState;
