use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse};
use crate::{
    extractors::ValidJson,
    models::{
        answer::{AnswerRequest, StartQuizRequest},
        session::{AnswerResponse, HintResponse, NextStep, QuizSnapshot},
    },
    services::AppState,
};

/// POST /api/v1/students/{student_id}/quiz
pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    ValidJson(req): ValidJson<StartQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        "Starting quiz: student={}, level={}, resume_at={:?}",
        student_id,
        req.level_id,
        req.exercise_id
    );

    let snapshot = state
        .engine
        .start_level(&student_id, &req.level_id, req.exercise_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(snapshot)))
}

/// GET /api/v1/students/{student_id}/quiz
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ApiResponse<QuizSnapshot>>, ApiError> {
    let snapshot = state.engine.snapshot(&student_id).await?;
    Ok(ApiResponse::ok(snapshot))
}

/// POST /api/v1/students/{student_id}/quiz/answer
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    ValidJson(req): ValidJson<AnswerRequest>,
) -> Result<Json<ApiResponse<AnswerResponse>>, ApiError> {
    tracing::info!(
        "Answer selected: student={}, exercise={}",
        student_id,
        req.exercise_id
    );

    let response = state
        .engine
        .answer(&student_id, &req.exercise_id, &req.answer)
        .await?;
    Ok(ApiResponse::ok(response))
}

/// POST /api/v1/students/{student_id}/quiz/hint
pub async fn request_hint(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ApiResponse<HintResponse>>, ApiError> {
    let hint = state.engine.reveal_hint(&student_id).await?;
    Ok(ApiResponse::ok(hint))
}

/// POST /api/v1/students/{student_id}/quiz/next
pub async fn next_exercise(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ApiResponse<NextStep>>, ApiError> {
    let step = state.engine.next(&student_id).await?;
    Ok(ApiResponse::ok(step))
}

/// DELETE /api/v1/students/{student_id}/quiz
pub async fn exit_quiz(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    tracing::info!("Exiting quiz: student={}", student_id);
    state.engine.exit(&student_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
