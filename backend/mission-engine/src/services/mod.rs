use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::EngineResult;
use crate::utils::retry::RetryConfig;

use self::mission_api::{HttpMissionApi, MissionApi};
use self::quiz_engine::{EngineSettings, QuizEngine};

pub struct AppState {
    pub engine: Arc<QuizEngine>,
}

impl AppState {
    /// Builds the state around the HTTP mission API client from `config`.
    pub fn new(config: Config) -> EngineResult<Self> {
        let api = HttpMissionApi::new(
            &config.mission_api_url,
            config.mission_api_token.clone(),
            Duration::from_millis(config.mission_api_timeout_ms),
        )?;
        tracing::info!("Mission API client configured: {}", config.mission_api_url);
        Ok(Self::with_api(&config, Arc::new(api)))
    }

    /// Same as [`AppState::new`] but with any [`MissionApi`] implementation.
    pub fn with_api(config: &Config, api: Arc<dyn MissionApi>) -> Self {
        let settings = EngineSettings {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            fetch_retry: RetryConfig::with_attempts(config.fetch_retry_attempts),
        };
        Self {
            engine: Arc::new(QuizEngine::new(api, settings)),
        }
    }
}

pub mod achievements;
pub mod catalog;
pub mod countdown;
pub mod dispatcher;
pub mod mission_api;
pub mod navigator;
pub mod progress;
pub mod quiz_engine;
pub mod quiz_session;
pub mod scoring;
pub mod unlock;
