use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_DATA_DIR: &str = ".finanzas";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    /// Replaces every game's feedback delay when set (useful for demos and slow terminals)
    pub feedback_delay_override: Option<Duration>,
}

impl Config {
    /// Defaults for everything but the server address
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            feedback_delay_override: None,
        }
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP__)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        // Extract values with fallbacks to ENV or defaults
        let raw_url = settings
            .get_string("api.url")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = parse_base_url(&raw_url)?;

        let timeout_seconds = settings
            .get_int("api.timeout_seconds")
            .ok()
            .or_else(|| env::var("API_TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS as i64);
        if timeout_seconds <= 0 {
            return Err(config::ConfigError::Message(format!(
                "api.timeout_seconds must be positive, got {}",
                timeout_seconds
            )));
        }

        let data_dir = settings
            .get_string("storage.data_dir")
            .or_else(|_| env::var("DATA_DIR"))
            .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());

        let feedback_delay_override = settings
            .get_int("game.feedback_delay_ms")
            .ok()
            .filter(|ms| *ms >= 0)
            .map(|ms| Duration::from_millis(ms as u64));

        Ok(Config {
            api_url,
            request_timeout: Duration::from_secs(timeout_seconds as u64),
            data_dir: PathBuf::from(data_dir),
            feedback_delay_override,
        })
    }
}

/// Endpoint paths are joined onto the base URL, so it has to end with a slash.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, config::ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| config::ConfigError::Message(format!("invalid api.url {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(config::ConfigError::Message(format!(
            "api.url must be http or https, got {}",
            other
        ))),
    }
}
