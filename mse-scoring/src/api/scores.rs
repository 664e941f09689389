//! Score submission and retrieval

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiError;
use crate::model::{Competitor, HeatNumber, Operation, RawForm, ScoreRecord};
use crate::service::{ScoreSubmission, SubmitOutcome};
use crate::AppState;

/// Body of POST /api/scores; exactly one of `athlete_id` / `team_id`
#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    #[serde(default)]
    pub athlete_id: Option<Uuid>,
    #[serde(default)]
    pub team_id: Option<Uuid>,
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub judge_id: Uuid,
    #[serde(default)]
    pub heat_number: Option<HeatNumber>,
    /// Raw values as typed by the judge
    #[serde(default)]
    pub values: RawForm,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SubmitScoreRequest {
    fn competitor(&self) -> Result<Competitor, ApiError> {
        match (self.athlete_id, self.team_id) {
            (Some(athlete), None) => Ok(Competitor::Athlete(athlete)),
            (None, Some(team)) => Ok(Competitor::Team(team)),
            (Some(_), Some(_)) => Err(ApiError::BadRequest(
                "athlete_id and team_id are mutually exclusive".to_string(),
            )),
            (None, None) => Err(ApiError::BadRequest(
                "one of athlete_id or team_id is required".to_string(),
            )),
        }
    }
}

/// POST /api/scores
///
/// 201 when the submission created records, 200 when it replaced them.
pub async fn submit_score(
    State(state): State<AppState>,
    Json(request): Json<SubmitScoreRequest>,
) -> Result<(StatusCode, Json<SubmitOutcome>), ApiError> {
    let submission = ScoreSubmission {
        competitor: request.competitor()?,
        event_id: request.event_id,
        modality_id: request.modality_id,
        judge_id: request.judge_id,
        heat_number: request.heat_number,
        form: request.values,
        notes: request.notes,
    };

    let outcome = state.service.submit_score(submission).await?;
    let status = match outcome.operation {
        Operation::Insert => StatusCode::CREATED,
        Operation::Update => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

/// Query of GET /api/scores
#[derive(Debug, Deserialize)]
pub struct ScoresQuery {
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub judge_id: Uuid,
    #[serde(default)]
    pub heat_number: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ScoresResponse {
    pub count: usize,
    pub scores: Vec<ScoreRecord>,
}

/// GET /api/scores?event_id=..&modality_id=..&judge_id=..[&heat_number=..]
pub async fn existing_scores(
    State(state): State<AppState>,
    Query(query): Query<ScoresQuery>,
) -> Result<Json<ScoresResponse>, ApiError> {
    let heat_number = match query.heat_number {
        Some(n) => Some(
            HeatNumber::new(n)
                .ok_or_else(|| ApiError::BadRequest("heat_number must be positive".to_string()))?,
        ),
        None => None,
    };

    let scores = state
        .service
        .existing_scores(query.event_id, query.modality_id, query.judge_id, heat_number)
        .await?;

    Ok(Json(ScoresResponse {
        count: scores.len(),
        scores,
    }))
}
