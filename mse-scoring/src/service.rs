//! Scoring service facade
//!
//! Entry point shared by the HTTP handlers and library callers: resolves the
//! modality's rule model, normalizes the judge's form and persists it through
//! the coordinator.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::coordinator::ScoreCoordinator;
use crate::db::{catalog, scores};
use crate::error::{Result, ScoringError};
use crate::heats::HeatManager;
use crate::model::{
    Competitor, Heat, HeatNumber, ModalityMeta, Operation, RawForm, ScoreRecord, ScoringModel,
};
use crate::normalizer::{normalize, Degradation, DraftContext, ScoreDraft};

/// One judge submission
#[derive(Debug, Clone)]
pub struct ScoreSubmission {
    pub competitor: Competitor,
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub judge_id: Uuid,
    /// Heat selected in the UI
    pub heat_number: Option<HeatNumber>,
    pub form: RawForm,
    pub notes: Option<String>,
}

/// Result of a submission: the saved records and any coerced inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub operation: Operation,
    pub records: Vec<ScoreRecord>,
    pub degradations: Vec<Degradation>,
}

#[derive(Clone)]
pub struct ScoringService {
    db: SqlitePool,
    coordinator: ScoreCoordinator,
    heats: HeatManager,
}

impl ScoringService {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            coordinator: ScoreCoordinator::new(db.clone()),
            heats: HeatManager::new(db.clone()),
            db,
        }
    }

    pub async fn submit_score(&self, submission: ScoreSubmission) -> Result<SubmitOutcome> {
        let meta = self.modality(submission.modality_id).await?;
        if let Competitor::Team(team_id) = submission.competitor {
            if !meta.is_team {
                return Err(ScoringError::InvalidInput(format!(
                    "team {} submitted for individual modality {}",
                    team_id, meta.name
                )));
            }
        }
        let model = self.model_for(&meta).await?;

        let normalized = normalize(&submission.form, &model);
        let ctx = DraftContext {
            event_id: submission.event_id,
            modality_id: submission.modality_id,
            judge_id: submission.judge_id,
            team_id: None,
            heat_number: submission.heat_number,
            notes: submission.notes,
            uses_heats: meta.uses_heats,
            recorded_at: Utc::now(),
        };
        let draft = ScoreDraft::assemble(&normalized, &ctx);

        let (operation, records) = match submission.competitor {
            Competitor::Athlete(athlete_id) => {
                let saved = self.coordinator.save_individual(&draft, athlete_id).await?;
                (saved.operation, vec![saved.record])
            }
            Competitor::Team(team_id) => {
                let saved = self.coordinator.save_team(&draft, team_id).await?;
                (saved.operation, saved.records)
            }
        };

        Ok(SubmitOutcome {
            operation,
            records,
            degradations: normalized.degradations,
        })
    }

    /// Records a judge already entered, optionally for one heat
    pub async fn existing_scores(
        &self,
        event_id: Uuid,
        modality_id: Uuid,
        judge_id: Uuid,
        heat_number: Option<HeatNumber>,
    ) -> Result<Vec<ScoreRecord>> {
        let mut conn = self
            .db
            .acquire()
            .await
            .map_err(ScoringError::lookup("acquire connection"))?;
        let records = scores::list_records(&mut conn, event_id, modality_id, judge_id, heat_number)
            .await
            .map_err(ScoringError::lookup(format!("scores of modality {}", modality_id)))?;
        debug!(%event_id, %modality_id, %judge_id, count = records.len(), "Loaded existing scores");
        Ok(records)
    }

    pub async fn list_heats(&self, modality_id: Uuid) -> Result<Vec<Heat>> {
        self.heats.list_heats(modality_id).await
    }

    pub async fn create_heat(&self, modality_id: Uuid) -> Result<Heat> {
        self.heats.create_heat(modality_id).await
    }

    pub async fn create_final_heat(&self, modality_id: Uuid) -> Result<Heat> {
        self.heats.create_final_heat(modality_id).await
    }

    /// Authored model, or one derived from the modality's rule type
    pub async fn scoring_model(&self, modality_id: Uuid) -> Result<ScoringModel> {
        let meta = self.modality(modality_id).await?;
        self.model_for(&meta).await
    }

    async fn modality(&self, modality_id: Uuid) -> Result<ModalityMeta> {
        catalog::modality_meta(&self.db, modality_id)
            .await
            .map_err(ScoringError::lookup(format!("modality {}", modality_id)))?
            .ok_or(ScoringError::ModalityNotFound { modality_id })
    }

    async fn model_for(&self, meta: &ModalityMeta) -> Result<ScoringModel> {
        let model = catalog::scoring_model(&self.db, meta.modality_id)
            .await
            .map_err(ScoringError::lookup(format!("scoring model of {}", meta.modality_id)))?;
        Ok(model.unwrap_or_else(|| ScoringModel::fallback(meta)))
    }
}
