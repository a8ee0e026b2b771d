use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse};
use crate::{
    models::{LevelMap, PlanetUnlockView, ProgressOverview},
    services::AppState,
};

/// GET /api/v1/students/{student_id}/planets
pub async fn list_planets(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PlanetUnlockView>>>, ApiError> {
    let planets = state.engine.planets(&student_id).await?;
    Ok(ApiResponse::ok(planets))
}

/// GET /api/v1/students/{student_id}/planets/{planet_id}/levels
pub async fn level_map(
    State(state): State<Arc<AppState>>,
    Path((student_id, planet_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<LevelMap>>, ApiError> {
    let map = state.engine.level_map(&student_id, &planet_id).await?;
    tracing::debug!(
        "Level map: student={}, planet={}, current={:?}, source={:?}",
        student_id,
        planet_id,
        map.current_level_id,
        map.source
    );
    Ok(ApiResponse::ok(map))
}

/// GET /api/v1/students/{student_id}/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ApiResponse<ProgressOverview>>, ApiError> {
    let overview = state.engine.dashboard(&student_id).await?;
    Ok(ApiResponse::ok(overview))
}
