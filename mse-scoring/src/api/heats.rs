//! Heat endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::ApiError;
use crate::model::Heat;
use crate::AppState;

/// GET /api/modalities/:id/heats
pub async fn list_heats(
    State(state): State<AppState>,
    Path(modality_id): Path<Uuid>,
) -> Result<Json<Vec<Heat>>, ApiError> {
    Ok(Json(state.service.list_heats(modality_id).await?))
}

/// POST /api/modalities/:id/heats
pub async fn create_heat(
    State(state): State<AppState>,
    Path(modality_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Heat>), ApiError> {
    let heat = state.service.create_heat(modality_id).await?;
    Ok((StatusCode::CREATED, Json(heat)))
}

/// POST /api/modalities/:id/heats/final
pub async fn create_final_heat(
    State(state): State<AppState>,
    Path(modality_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Heat>), ApiError> {
    let heat = state.service.create_final_heat(modality_id).await?;
    Ok((StatusCode::CREATED, Json(heat)))
}
