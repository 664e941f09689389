//! Heat (battery) lifecycle
//!
//! [`HeatManager`] creates and lists heats in storage. [`HeatBoard`] is the
//! judge-side selection state: which heat is open, which athletes already
//! have a score in it, and which have been promoted into the active table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::retry::{retry_on_lock, MAX_LOCK_WAIT_MS};
use crate::db::{catalog, heats, is_unique_violation};
use crate::error::{Result, ScoringError};
use crate::model::{Heat, HeatNumber, ModalityMeta, ScoreRecord};

#[derive(Clone)]
pub struct HeatManager {
    db: SqlitePool,
}

impl HeatManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Heats ordered by number, final last
    pub async fn list_heats(&self, modality_id: Uuid) -> Result<Vec<Heat>> {
        let mut conn = self
            .db
            .acquire()
            .await
            .map_err(ScoringError::lookup("acquire connection"))?;
        let list = heats::list_heats(&mut conn, modality_id)
            .await
            .map_err(ScoringError::lookup(format!("heats of modality {}", modality_id)))?;
        debug!(%modality_id, count = list.len(), "Listed heats");
        Ok(list)
    }

    /// Open the next regular heat
    pub async fn create_heat(&self, modality_id: Uuid) -> Result<Heat> {
        let meta = self.modality(modality_id).await?;
        if !meta.uses_heats {
            return Err(ScoringError::HeatsDisabled { modality_id });
        }

        let (number, created_at) =
            retry_on_lock("create heat", MAX_LOCK_WAIT_MS, || self.insert_next_heat(modality_id))
                .await?;

        info!(%modality_id, heat = number.get(), "Heat created");

        Ok(Heat {
            modality_id,
            number,
            display_name: number.display_name(),
            athlete_count: 0,
            created_at,
        })
    }

    /// Open the modality's final heat (number 999); at most one per modality
    pub async fn create_final_heat(&self, modality_id: Uuid) -> Result<Heat> {
        let meta = self.modality(modality_id).await?;
        if !meta.uses_heats {
            return Err(ScoringError::HeatsDisabled { modality_id });
        }
        if !meta.allows_final_heat {
            return Err(ScoringError::FinalHeatNotAllowed { modality_id });
        }

        let number = HeatNumber::FINAL;
        let created_at =
            retry_on_lock("create final heat", MAX_LOCK_WAIT_MS, || self.insert_final_heat(modality_id))
                .await?;

        info!(%modality_id, "Final heat created");

        Ok(Heat {
            modality_id,
            number,
            display_name: number.display_name(),
            athlete_count: 0,
            created_at,
        })
    }

    async fn insert_next_heat(&self, modality_id: Uuid) -> Result<(HeatNumber, DateTime<Utc>)> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(ScoringError::persistence("begin heat transaction"))?;
        let number = heats::next_heat_number(&mut *tx, modality_id)
            .await
            .map_err(ScoringError::lookup(format!("next heat of modality {}", modality_id)))?;
        let created_at = Utc::now();
        heats::insert_heat(&mut *tx, modality_id, number, &created_at)
            .await
            .map_err(ScoringError::persistence(format!("create heat {}", number)))?;
        tx.commit()
            .await
            .map_err(ScoringError::persistence("commit heat"))?;
        Ok((number, created_at))
    }

    async fn insert_final_heat(&self, modality_id: Uuid) -> Result<DateTime<Utc>> {
        let number = HeatNumber::FINAL;
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(ScoringError::persistence("begin heat transaction"))?;

        let exists = heats::heat_exists(&mut *tx, modality_id, number)
            .await
            .map_err(ScoringError::lookup(format!("final heat of modality {}", modality_id)))?;
        if exists {
            return Err(ScoringError::DuplicateFinalHeat { modality_id });
        }

        let created_at = Utc::now();
        match heats::insert_heat(&mut *tx, modality_id, number, &created_at).await {
            Ok(()) => {}
            // Lost a race with another judge
            Err(e) if is_unique_violation(&e) => {
                return Err(ScoringError::DuplicateFinalHeat { modality_id })
            }
            Err(e) => return Err(ScoringError::persistence("create final heat")(e)),
        }
        tx.commit()
            .await
            .map_err(ScoringError::persistence("commit final heat"))?;
        Ok(created_at)
    }

    async fn modality(&self, modality_id: Uuid) -> Result<ModalityMeta> {
        catalog::modality_meta(&self.db, modality_id)
            .await
            .map_err(ScoringError::lookup(format!("modality {}", modality_id)))?
            .ok_or(ScoringError::ModalityNotFound { modality_id })
    }
}

/// Athletes of the selected heat split by whether they have a score in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeatPartition {
    pub scored: Vec<Uuid>,
    pub unscored: Vec<Uuid>,
}

/// Heat selection state of one judging table
///
/// For modalities without heats every athlete is active and every record is
/// in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatBoard {
    uses_heats: bool,
    selected: Option<HeatNumber>,
    promoted: BTreeSet<Uuid>,
}

impl HeatBoard {
    pub fn new(uses_heats: bool) -> Self {
        Self {
            uses_heats,
            selected: None,
            promoted: BTreeSet::new(),
        }
    }

    pub fn uses_heats(&self) -> bool {
        self.uses_heats
    }

    pub fn selected(&self) -> Option<HeatNumber> {
        self.selected
    }

    /// Switch to another heat; promotions belong to the heat they were made in
    pub fn select_heat(&mut self, number: HeatNumber) {
        if !self.uses_heats || self.selected == Some(number) {
            return;
        }
        self.selected = Some(number);
        self.promoted.clear();
    }

    /// Move an unscored athlete into the active table
    ///
    /// Returns false when no heat is selected or the athlete was already
    /// promoted.
    pub fn promote(&mut self, athlete_id: Uuid) -> bool {
        if !self.uses_heats || self.selected.is_none() {
            return false;
        }
        self.promoted.insert(athlete_id)
    }

    fn has_score(&self, athlete_id: Uuid, records: &[ScoreRecord]) -> bool {
        records
            .iter()
            .any(|r| r.athlete_id == athlete_id && r.heat_number == self.selected)
    }

    /// Split `athletes` into scored / not-yet-scored for the selected heat
    pub fn partition(&self, athletes: &[Uuid], records: &[ScoreRecord]) -> HeatPartition {
        let mut partition = HeatPartition::default();
        for athlete in athletes {
            if !self.uses_heats || self.has_score(*athlete, records) {
                partition.scored.push(*athlete);
            } else {
                partition.unscored.push(*athlete);
            }
        }
        partition
    }

    /// Whether an athlete's row is shown in the active table
    pub fn is_active(&self, athlete_id: Uuid, records: &[ScoreRecord]) -> bool {
        if !self.uses_heats {
            return true;
        }
        self.selected.is_some()
            && (self.promoted.contains(&athlete_id) || self.has_score(athlete_id, records))
    }

    /// Records visible under the current selection
    pub fn scores_in_scope<'a>(&self, records: &'a [ScoreRecord]) -> Vec<&'a ScoreRecord> {
        if !self.uses_heats {
            return records.iter().collect();
        }
        match self.selected {
            Some(heat) => records
                .iter()
                .filter(|r| r.heat_number == Some(heat))
                .collect(),
            None => Vec::new(),
        }
    }
}
