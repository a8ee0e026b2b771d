use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{EngineError, EngineResult};
use crate::metrics::track_remote_call;
use crate::models::answer::{SubmitAnswerData, SubmitAnswerRequest};
use crate::models::progress::RemoteUnlockStatus;
use crate::models::{Achievement, ApiEnvelope, Level, LevelProgress, Planet, RawExercise};

pub const STUDENT_ID_HEADER: &str = "x-student-id";

/// Contract of the remote mission API that owns content and progress.
#[async_trait]
pub trait MissionApi: Send + Sync {
    async fn ping(&self) -> EngineResult<()>;

    async fn planets(&self) -> EngineResult<Vec<Planet>>;

    async fn levels_by_planet(&self, planet_id: &str) -> EngineResult<Vec<Level>>;

    async fn exercises_by_level(&self, level_id: &str) -> EngineResult<Vec<RawExercise>>;

    async fn exercise_by_id(&self, exercise_id: &str) -> EngineResult<RawExercise>;

    async fn submit_answer(
        &self,
        student_id: &str,
        exercise_id: &str,
        request: &SubmitAnswerRequest,
    ) -> EngineResult<SubmitAnswerData>;

    async fn levels_with_unlock_status(
        &self,
        student_id: &str,
        planet_id: &str,
    ) -> EngineResult<RemoteUnlockStatus>;

    async fn user_progress(&self, student_id: &str) -> EngineResult<Vec<LevelProgress>>;

    async fn achievements(&self) -> EngineResult<Vec<Achievement>>;
}

/// reqwest-backed client for the mission API.
pub struct HttpMissionApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpMissionApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> EngineResult<Self> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| EngineError::Config(format!("mission API url {}: {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> EngineResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| EngineError::Config(format!("invalid API path {}: {}", path, e)))
    }

    fn authorize(&self, builder: RequestBuilder, student_id: Option<&str>) -> RequestBuilder {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        match student_id {
            Some(id) => builder.header(STUDENT_ID_HEADER, id),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        resource: String,
        path: String,
        student_id: Option<&str>,
    ) -> EngineResult<T> {
        let url = self.url(&path)?;
        tracing::debug!("Calling mission API: GET {}", url);
        let request = self.authorize(self.client.get(url), student_id);

        track_remote_call(endpoint, async {
            let response = request
                .send()
                .await
                .map_err(|e| EngineError::fetch(&resource, e.to_string()))?;
            read_envelope(&resource, response).await
        })
        .await
    }
}

async fn read_envelope<T: DeserializeOwned>(
    resource: &str,
    response: reqwest::Response,
) -> EngineResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(EngineError::not_found(resource));
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(EngineError::fetch(
            resource,
            format!("mission API returned {}: {}", status, body),
        ));
    }

    let envelope: ApiEnvelope<T> = response
        .json()
        .await
        .map_err(|e| EngineError::fetch(resource, format!("unreadable response: {}", e)))?;

    if !envelope.success {
        return Err(EngineError::fetch(
            resource,
            envelope
                .message
                .unwrap_or_else(|| "request rejected".to_string()),
        ));
    }

    envelope
        .data
        .ok_or_else(|| EngineError::fetch(resource, "response carried no data"))
}

#[async_trait]
impl MissionApi for HttpMissionApi {
    async fn ping(&self) -> EngineResult<()> {
        let url = self.url("health")?;
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(1))
            .send()
            .await
            .map_err(|e| EngineError::fetch("health", e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::fetch(
                "health",
                format!("status {}", response.status()),
            ))
        }
    }

    async fn planets(&self) -> EngineResult<Vec<Planet>> {
        self.get("planets", "planets".into(), "planets".into(), None)
            .await
    }

    async fn levels_by_planet(&self, planet_id: &str) -> EngineResult<Vec<Level>> {
        self.get(
            "levels_by_planet",
            format!("levels of planet {}", planet_id),
            format!("planets/{}/levels", planet_id),
            None,
        )
        .await
    }

    async fn exercises_by_level(&self, level_id: &str) -> EngineResult<Vec<RawExercise>> {
        self.get(
            "exercises_by_level",
            format!("exercises of level {}", level_id),
            format!("levels/{}/exercises", level_id),
            None,
        )
        .await
    }

    async fn exercise_by_id(&self, exercise_id: &str) -> EngineResult<RawExercise> {
        self.get(
            "exercise_by_id",
            format!("exercise {}", exercise_id),
            format!("exercises/{}", exercise_id),
            None,
        )
        .await
    }

    async fn submit_answer(
        &self,
        student_id: &str,
        exercise_id: &str,
        request: &SubmitAnswerRequest,
    ) -> EngineResult<SubmitAnswerData> {
        let resource = format!("submission for exercise {}", exercise_id);
        let url = self.url(&format!("exercises/{}/submit", exercise_id))?;
        tracing::debug!("Calling mission API: POST {}", url);
        let builder = self.authorize(self.client.post(url).json(request), Some(student_id));

        track_remote_call("submit_answer", async {
            let response = builder
                .send()
                .await
                .map_err(|e| EngineError::Submission(e.to_string()))?;
            read_envelope(&resource, response)
                .await
                .map_err(|e| EngineError::Submission(e.to_string()))
        })
        .await
    }

    async fn levels_with_unlock_status(
        &self,
        student_id: &str,
        planet_id: &str,
    ) -> EngineResult<RemoteUnlockStatus> {
        self.get(
            "levels_with_unlock_status",
            format!("unlock status of planet {}", planet_id),
            format!("planets/{}/levels/unlock-status", planet_id),
            Some(student_id),
        )
        .await
    }

    async fn user_progress(&self, student_id: &str) -> EngineResult<Vec<LevelProgress>> {
        self.get(
            "user_progress",
            format!("progress of student {}", student_id),
            format!("progress/users/{}", student_id),
            Some(student_id),
        )
        .await
    }

    async fn achievements(&self) -> EngineResult<Vec<Achievement>> {
        self.get(
            "achievements",
            "achievements".into(),
            "achievements".into(),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_keeps_base_path_prefix() {
        let api = HttpMissionApi::new("http://api.local/api/v1", None, Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            api.url("levels/l1/exercises").unwrap().as_str(),
            "http://api.local/api/v1/levels/l1/exercises"
        );
        assert_eq!(
            api.url("/planets").unwrap().as_str(),
            "http://api.local/api/v1/planets"
        );
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = HttpMissionApi::new("not a url", None, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
