use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::EngineError;
use crate::metrics;
use crate::services::AppState;

pub mod progress;
pub mod quiz;
pub mod sse;

/// Error body shared by every UI route.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Engine(EngineError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

fn engine_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Fetch { .. } | EngineError::Submission(_) => StatusCode::BAD_GATEWAY,
        EngineError::MalformedExercise { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::NotFound { .. } | EngineError::NoActiveQuiz(_) => StatusCode::NOT_FOUND,
        EngineError::AnswerPending(_) | EngineError::QuestionClosed(_) => StatusCode::CONFLICT,
        EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, false),
            ApiError::Engine(err) => {
                let status = engine_status(&err);
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", err);
                } else {
                    tracing::debug!("Request rejected: {}", err);
                }
                (status, err.to_string(), err.is_retryable())
            }
        };
        let json_response = json!({
            "success": false,
            "message": message,
            "retryable": retryable,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}

/// Success envelope, mirroring the mission API's own.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();

    let mission_api = check_mission_api(&state).await;
    let healthy = mission_api.get("status").and_then(|v| v.as_str()) == Some("healthy");
    dependencies.insert("mission_api".to_string(), json!(mission_api));

    let (status_code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "spacemission-engine",
            "version": env!("CARGO_PKG_VERSION"),
            "active_runs": state.engine.active_runs().await,
            "event_streams": state.engine.event_streams(),
            "dependencies": dependencies
        })),
    )
}

async fn check_mission_api(state: &AppState) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();

    match tokio::time::timeout(
        std::time::Duration::from_secs(1),
        state.engine.check_remote(),
    )
    .await
    {
        Ok(Ok(())) => {
            result.insert("status".to_string(), json!("healthy"));
            result.insert("message".to_string(), json!("Mission API reachable"));
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("Mission API error: {}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("Mission API timeout after 1s"));
        }
    }

    result
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Protects /metrics with HTTP Basic auth (`METRICS_AUTH=user:password`).
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());
    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
