//! Score payload assembly
//!
//! Joins a normalized result with the submission context. The draft holds
//! everything except the athlete, so a team submission fans one draft out to
//! every roster member.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Normalized;
use crate::model::{AttemptValues, HeatNumber, Magnitude, ScoreKey, ScoreRecord, ScoreUnit};

/// Submission context supplied alongside the raw form
#[derive(Debug, Clone)]
pub struct DraftContext {
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub judge_id: Uuid,
    pub team_id: Option<Uuid>,
    /// Heat chosen in the UI; wins over a `heat` field in the form
    pub heat_number: Option<HeatNumber>,
    pub notes: Option<String>,
    pub uses_heats: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Score payload ready to persist for one or more athletes
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDraft {
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub judge_id: Uuid,
    pub team_id: Option<Uuid>,
    pub heat_number: Option<HeatNumber>,
    pub magnitude: Magnitude,
    pub unit: ScoreUnit,
    pub lane: Option<u32>,
    pub attempt_values: AttemptValues,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ScoreDraft {
    pub fn assemble(normalized: &Normalized, ctx: &DraftContext) -> Self {
        let heat_number = if ctx.uses_heats {
            ctx.heat_number.or(normalized.data.heat_number)
        } else {
            None
        };

        let notes = ctx
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Self {
            event_id: ctx.event_id,
            modality_id: ctx.modality_id,
            judge_id: ctx.judge_id,
            team_id: ctx.team_id,
            heat_number,
            magnitude: normalized.data.magnitude,
            unit: normalized.data.unit,
            lane: normalized.data.lane,
            attempt_values: normalized.attempt_values.clone(),
            notes,
            recorded_at: ctx.recorded_at,
        }
    }

    pub fn key_for(&self, athlete_id: Uuid) -> ScoreKey {
        ScoreKey {
            event_id: self.event_id,
            modality_id: self.modality_id,
            athlete_id,
            heat_number: self.heat_number,
        }
    }

    /// Record for `athlete_id` under the given row id
    pub fn to_record(&self, id: Uuid, athlete_id: Uuid) -> ScoreRecord {
        ScoreRecord {
            id,
            event_id: self.event_id,
            modality_id: self.modality_id,
            athlete_id,
            team_id: self.team_id,
            heat_number: self.heat_number,
            judge_id: self.judge_id,
            magnitude: self.magnitude,
            unit: self.unit,
            lane: self.lane,
            attempt_values: self.attempt_values.clone(),
            notes: self.notes.clone(),
            recorded_at: self.recorded_at,
        }
    }
}
