//! Score persistence coordinator
//!
//! Create-or-replace per score key. A key is looked up and written inside the
//! same transaction, so a failed write leaves whatever was stored before.
//! Team submissions fan one draft out to every roster member and commit all
//! of them or none. A transaction that loses the write lock to another judge
//! is rerun from the start.

use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::retry::{retry_on_lock, MAX_LOCK_WAIT_MS};
use crate::db::{catalog, scores};
use crate::error::{Result, ScoringError};
use crate::model::{Operation, ScoreRecord};
use crate::normalizer::ScoreDraft;

/// Outcome of an individual save
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedScore {
    pub record: ScoreRecord,
    pub operation: Operation,
}

/// Outcome of a team save: one record per roster member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSave {
    pub operation: Operation,
    pub records: Vec<ScoreRecord>,
}

#[derive(Clone)]
pub struct ScoreCoordinator {
    db: SqlitePool,
}

impl ScoreCoordinator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert or replace the score of one athlete
    pub async fn save_individual(&self, draft: &ScoreDraft, athlete_id: Uuid) -> Result<SavedScore> {
        let (record, operation) = retry_on_lock("save score", MAX_LOCK_WAIT_MS, || {
            self.write_individual(draft, athlete_id)
        })
        .await?;

        info!(
            operation = operation.as_str(),
            record_id = %record.id,
            %athlete_id,
            modality_id = %record.modality_id,
            heat = ?record.heat_number.map(|h| h.get()),
            magnitude = %record.magnitude,
            "Score saved"
        );

        Ok(SavedScore { record, operation })
    }

    async fn write_individual(
        &self,
        draft: &ScoreDraft,
        athlete_id: Uuid,
    ) -> Result<(ScoreRecord, Operation)> {
        let key = draft.key_for(athlete_id);
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(ScoringError::persistence("begin score transaction"))?;

        let existing = scores::find_record(&mut *tx, &key)
            .await
            .map_err(ScoringError::lookup(format!("score of athlete {}", athlete_id)))?;

        let (record, operation) = match existing {
            Some(found) => {
                debug!(record_id = %found.id, %athlete_id, "Replacing existing score");
                let record = draft.to_record(found.id, athlete_id);
                scores::update_record(&mut *tx, &record)
                    .await
                    .map_err(ScoringError::persistence(format!("update score {}", record.id)))?;
                (record, Operation::Update)
            }
            None => {
                let record = draft.to_record(Uuid::new_v4(), athlete_id);
                scores::insert_record(&mut *tx, &record)
                    .await
                    .map_err(ScoringError::persistence(format!("insert score for athlete {}", athlete_id)))?;
                (record, Operation::Insert)
            }
        };

        tx.commit()
            .await
            .map_err(ScoringError::persistence("commit score"))?;

        Ok((record, operation))
    }

    /// Write the same score for every member of a team
    ///
    /// Existing records of roster members in the draft's heat are replaced in
    /// place (including ones first entered individually); members without a
    /// record get a new one.
    pub async fn save_team(&self, draft: &ScoreDraft, team_id: Uuid) -> Result<TeamSave> {
        let roster = catalog::team_roster(&self.db, draft.modality_id, draft.event_id, team_id)
            .await
            .map_err(ScoringError::lookup(format!("roster of team {}", team_id)))?;

        if roster.is_empty() {
            return Err(ScoringError::TeamNotFound { team_id });
        }

        let mut draft = draft.clone();
        draft.team_id = Some(team_id);
        let draft = &draft;
        let roster = &roster;

        let (records, replaced) = retry_on_lock("save team score", MAX_LOCK_WAIT_MS, || {
            self.write_team(draft, team_id, roster)
        })
        .await?;

        let operation = if replaced == 0 {
            Operation::Insert
        } else {
            Operation::Update
        };

        info!(
            operation = operation.as_str(),
            %team_id,
            members = records.len(),
            replaced,
            heat = ?draft.heat_number.map(|h| h.get()),
            magnitude = %draft.magnitude,
            "Team score saved"
        );

        Ok(TeamSave { operation, records })
    }

    /// One all-or-nothing fan-out; returns the records and how many replaced
    /// an existing one
    async fn write_team(
        &self,
        draft: &ScoreDraft,
        team_id: Uuid,
        roster: &[Uuid],
    ) -> Result<(Vec<ScoreRecord>, usize)> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(ScoringError::persistence("begin team transaction"))?;

        let existing: HashMap<Uuid, Uuid> = scores::find_records_for_athletes(
            &mut *tx,
            draft.event_id,
            draft.modality_id,
            draft.heat_number,
            roster,
        )
        .await
        .map_err(ScoringError::lookup(format!("scores of team {}", team_id)))?
        .into_iter()
        .map(|r| (r.athlete_id, r.id))
        .collect();

        let mut records = Vec::with_capacity(roster.len());
        for athlete_id in roster {
            match existing.get(athlete_id) {
                Some(record_id) => {
                    let record = draft.to_record(*record_id, *athlete_id);
                    scores::update_record(&mut *tx, &record)
                        .await
                        .map_err(ScoringError::persistence(format!(
                            "update team {} score {}",
                            team_id, record.id
                        )))?;
                    records.push(record);
                }
                None => {
                    let record = draft.to_record(Uuid::new_v4(), *athlete_id);
                    scores::insert_record(&mut *tx, &record)
                        .await
                        .map_err(ScoringError::persistence(format!(
                            "insert team {} score for athlete {}",
                            team_id, athlete_id
                        )))?;
                    records.push(record);
                }
            }
        }

        tx.commit()
            .await
            .map_err(ScoringError::persistence(format!("commit team {} scores", team_id)))?;

        Ok((records, existing.len()))
    }
}
