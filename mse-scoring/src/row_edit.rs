//! Per-athlete row editing
//!
//! Each athlete row on a judging table moves through
//! `Viewing -> Editing -> Saving -> Viewing`, or back to `Editing` when the
//! save fails. [`reduce`] is the whole state machine; [`ScoreSheet`] keeps one
//! row state per athlete next to the records fetched from the server, scoped
//! to the selected heat.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{HeatNumber, RawForm, ScoreRecord};
use crate::normalizer::form::value_to_text;

/// Unsaved input of one row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditBuffer {
    pub values: RawForm,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowState {
    Viewing,
    Editing {
        buffer: EditBuffer,
        /// Message of the last failed save
        last_error: Option<String>,
    },
    Saving {
        buffer: EditBuffer,
    },
}

impl RowState {
    fn name(&self) -> &'static str {
        match self {
            RowState::Viewing => "viewing",
            RowState::Editing { .. } => "editing",
            RowState::Saving { .. } => "saving",
        }
    }

    pub fn buffer(&self) -> Option<&EditBuffer> {
        match self {
            RowState::Viewing => None,
            RowState::Editing { buffer, .. } | RowState::Saving { buffer } => Some(buffer),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer().map(|b| b.dirty).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    StartEdit { seed: EditBuffer },
    SetField { key: String, value: Value },
    Save,
    SaveSucceeded,
    SaveFailed { message: String },
    Cancel,
}

impl RowEvent {
    fn name(&self) -> &'static str {
        match self {
            RowEvent::StartEdit { .. } => "start editing",
            RowEvent::SetField { .. } => "change a field",
            RowEvent::Save => "save",
            RowEvent::SaveSucceeded => "complete a save",
            RowEvent::SaveFailed { .. } => "fail a save",
            RowEvent::Cancel => "cancel",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot {event} while {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

/// Next row state
///
/// Saves are not cancellable: `Cancel` while saving is rejected.
pub fn reduce(state: &RowState, event: RowEvent) -> Result<RowState, TransitionError> {
    let rejected = |event: &RowEvent| TransitionError {
        state: state.name(),
        event: event.name(),
    };

    match (state, event) {
        (RowState::Viewing, RowEvent::StartEdit { mut seed }) => {
            seed.dirty = false;
            Ok(RowState::Editing {
                buffer: seed,
                last_error: None,
            })
        }
        (RowState::Editing { buffer, last_error }, RowEvent::SetField { key, value }) => {
            let mut buffer = buffer.clone();
            buffer.values.insert(key, value);
            buffer.dirty = true;
            Ok(RowState::Editing {
                buffer,
                last_error: last_error.clone(),
            })
        }
        (RowState::Editing { buffer, .. }, RowEvent::Save) => Ok(RowState::Saving {
            buffer: buffer.clone(),
        }),
        (RowState::Editing { .. }, RowEvent::Cancel) => Ok(RowState::Viewing),
        (RowState::Saving { .. }, RowEvent::SaveSucceeded) => Ok(RowState::Viewing),
        (RowState::Saving { buffer }, RowEvent::SaveFailed { message }) => Ok(RowState::Editing {
            buffer: buffer.clone(),
            last_error: Some(message),
        }),
        (_, event) => Err(rejected(&event)),
    }
}

/// Buffer seeded from a persisted record
///
/// Formatted values are preferred over raw ones. When heats are in use and
/// the record has no `heat` field, the selected heat is filled in.
pub fn seed_buffer(record: Option<&ScoreRecord>, selected_heat: Option<HeatNumber>) -> EditBuffer {
    let mut values = RawForm::new();
    if let Some(record) = record {
        for (key, attempt) in &record.attempt_values {
            let text = if attempt.formatted_value.trim().is_empty() {
                &attempt.raw_value
            } else {
                &attempt.formatted_value
            };
            values.insert(key.clone(), Value::String(text.clone()));
        }
    }
    if let Some(heat) = selected_heat {
        values
            .entry("heat")
            .or_insert_with(|| Value::from(heat.get()));
    }
    EditBuffer {
        values,
        dirty: false,
    }
}

/// Payload produced when a row is saved
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub athlete_id: Uuid,
    pub heat_number: Option<HeatNumber>,
    pub form: RawForm,
}

/// Rows of one judging table
#[derive(Debug, Clone)]
pub struct ScoreSheet {
    uses_heats: bool,
    heat: Option<HeatNumber>,
    /// Every record known to the sheet, across heats
    loaded: Vec<ScoreRecord>,
    /// `loaded` restricted to the selected heat, by athlete
    records: HashMap<Uuid, ScoreRecord>,
    rows: HashMap<Uuid, RowState>,
}

static VIEWING: RowState = RowState::Viewing;

impl ScoreSheet {
    pub fn new(uses_heats: bool) -> Self {
        Self {
            uses_heats,
            heat: None,
            loaded: Vec::new(),
            records: HashMap::new(),
            rows: HashMap::new(),
        }
    }

    /// Select the heat that reads and new saves are scoped to
    pub fn set_heat(&mut self, heat: Option<HeatNumber>) {
        self.heat = if self.uses_heats { heat } else { None };
        self.rescope();
    }

    /// Replace the server-side view
    ///
    /// `records` may span several heats; only the selected heat's are shown.
    /// Rows being edited or saved keep their buffers; their records are
    /// refreshed underneath.
    pub fn load(&mut self, records: Vec<ScoreRecord>) {
        self.loaded = records;
        self.rescope();
    }

    fn in_scope(&self, record: &ScoreRecord) -> bool {
        if !self.uses_heats {
            return true;
        }
        match self.heat {
            Some(heat) => record.heat_number == Some(heat),
            None => false,
        }
    }

    fn rescope(&mut self) {
        let scoped: HashMap<Uuid, ScoreRecord> = self
            .loaded
            .iter()
            .filter(|r| self.in_scope(r))
            .map(|r| (r.athlete_id, r.clone()))
            .collect();
        self.records = scoped;
    }

    /// Insert or replace one record by id, or by athlete and heat
    fn merge(&mut self, record: ScoreRecord) {
        let existing = self.loaded.iter_mut().find(|r| {
            r.id == record.id
                || (r.athlete_id == record.athlete_id && r.heat_number == record.heat_number)
        });
        match existing {
            Some(slot) => *slot = record,
            None => self.loaded.push(record),
        }
    }

    pub fn record(&self, athlete_id: Uuid) -> Option<&ScoreRecord> {
        self.records.get(&athlete_id)
    }

    pub fn state(&self, athlete_id: Uuid) -> &RowState {
        self.rows.get(&athlete_id).unwrap_or(&VIEWING)
    }

    fn apply(&mut self, athlete_id: Uuid, event: RowEvent) -> Result<(), TransitionError> {
        let next = reduce(self.state(athlete_id), event)?;
        match next {
            RowState::Viewing => {
                self.rows.remove(&athlete_id);
            }
            other => {
                self.rows.insert(athlete_id, other);
            }
        }
        Ok(())
    }

    pub fn start_edit(&mut self, athlete_id: Uuid) -> Result<(), TransitionError> {
        let seed = seed_buffer(self.records.get(&athlete_id), self.heat);
        self.apply(athlete_id, RowEvent::StartEdit { seed })
    }

    pub fn set_field(
        &mut self,
        athlete_id: Uuid,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), TransitionError> {
        self.apply(
            athlete_id,
            RowEvent::SetField {
                key: key.into(),
                value,
            },
        )
    }

    /// Move a row to saving and return what to submit
    pub fn begin_save(&mut self, athlete_id: Uuid) -> Result<SaveRequest, TransitionError> {
        self.apply(athlete_id, RowEvent::Save)?;
        let mut form = self
            .state(athlete_id)
            .buffer()
            .map(|b| b.values.clone())
            .unwrap_or_default();
        if let Some(heat) = self.heat {
            form.entry("heat").or_insert_with(|| Value::from(heat.get()));
        }
        Ok(SaveRequest {
            athlete_id,
            heat_number: self.heat,
            form,
        })
    }

    /// Settle a save with the server's answer
    ///
    /// On success the authoritative records replace the local ones. A team
    /// save returns one record per member, so sibling rows are refreshed too.
    pub fn complete_save(
        &mut self,
        athlete_id: Uuid,
        outcome: std::result::Result<Vec<ScoreRecord>, String>,
    ) -> Result<(), TransitionError> {
        match outcome {
            Ok(records) => {
                self.apply(athlete_id, RowEvent::SaveSucceeded)?;
                for record in records {
                    self.merge(record);
                }
                self.rescope();
            }
            Err(message) => self.apply(athlete_id, RowEvent::SaveFailed { message })?,
        }
        Ok(())
    }

    pub fn cancel(&mut self, athlete_id: Uuid) -> Result<(), TransitionError> {
        self.apply(athlete_id, RowEvent::Cancel)
    }

    /// Value shown in a cell: the buffer while editing, the record otherwise
    pub fn displayed_value(&self, athlete_id: Uuid, key: &str) -> Option<String> {
        if let Some(buffer) = self.state(athlete_id).buffer() {
            return buffer.values.get(key).map(value_to_text);
        }
        self.records
            .get(&athlete_id)
            .and_then(|r| r.attempt_values.get(key))
            .map(|a| a.formatted_value.clone())
    }

    /// Athletes with unsaved changes, sorted
    pub fn dirty_athletes(&self) -> Vec<Uuid> {
        self.rows
            .iter()
            .filter(|(_, state)| state.is_dirty())
            .map(|(id, _)| *id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
