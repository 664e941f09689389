//! Scoring model endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::ApiError;
use crate::model::ScoringModel;
use crate::AppState;

/// GET /api/modalities/:id/model
///
/// Returns the authored model, or a field-less one built from the modality's
/// rule type when none was authored.
pub async fn get_scoring_model(
    State(state): State<AppState>,
    Path(modality_id): Path<Uuid>,
) -> Result<Json<ScoringModel>, ApiError> {
    Ok(Json(state.service.scoring_model(modality_id).await?))
}
