use serde::Deserialize;
use std::env;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mission_api_url: String,
    pub mission_api_token: Option<String>,
    pub mission_api_timeout_ms: u64,
    pub tick_interval_ms: u64,
    pub fetch_retry_attempts: usize,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mission_api_url: "http://localhost:8000/api/v1".to_string(),
            mission_api_token: None,
            mission_api_timeout_ms: 5000,
            tick_interval_ms: 1000,
            fetch_retry_attempts: 3,
            bind_addr: "0.0.0.0:8081".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> EngineResult<Self> {
        // Root .env first, then the local one.
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env_name = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml, then APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        Self::from_settings(&settings)
    }

    fn from_settings(settings: &config::Config) -> EngineResult<Self> {
        let defaults = Self::default();

        let mission_api_url = settings
            .get_string("mission_api.url")
            .or_else(|_| env::var("MISSION_API_URL"))
            .unwrap_or(defaults.mission_api_url);

        let mission_api_token = settings
            .get_string("mission_api.token")
            .or_else(|_| env::var("MISSION_API_TOKEN"))
            .ok()
            .filter(|token| !token.trim().is_empty());
        if mission_api_token.is_none() {
            tracing::warn!("MISSION_API_TOKEN not set, mission API calls are unauthenticated");
        }

        let mission_api_timeout_ms = read_number(
            settings,
            "mission_api.timeout_ms",
            "MISSION_API_TIMEOUT_MS",
            defaults.mission_api_timeout_ms,
        )?;

        let tick_interval_ms = read_number(
            settings,
            "quiz.tick_interval_ms",
            "QUIZ_TICK_INTERVAL_MS",
            defaults.tick_interval_ms,
        )?;
        if tick_interval_ms == 0 {
            return Err(EngineError::Config(
                "quiz.tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        let fetch_retry_attempts = read_number(
            settings,
            "quiz.fetch_retry_attempts",
            "QUIZ_FETCH_RETRY_ATTEMPTS",
            defaults.fetch_retry_attempts as u64,
        )? as usize;

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        Ok(Config {
            mission_api_url,
            mission_api_token,
            mission_api_timeout_ms,
            tick_interval_ms,
            fetch_retry_attempts,
            bind_addr,
        })
    }
}

fn read_number(
    settings: &config::Config,
    key: &str,
    env_key: &str,
    default: u64,
) -> EngineResult<u64> {
    if let Ok(value) = settings.get_int(key) {
        return u64::try_from(value)
            .map_err(|_| EngineError::Config(format!("{} must not be negative", key)));
    }
    match env::var(env_key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| EngineError::Config(format!("{}: {}", env_key, e))),
        Err(_) => Ok(default),
    }
}
