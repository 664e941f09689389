//! Canonical score values and persisted score records

use chrono::{DateTime, Utc};
use mse_common::RaceTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::heat::HeatNumber;

/// Raw form submitted by a judge: field key to JSON value
pub type RawForm = serde_json::Map<String, serde_json::Value>;

/// Unit tag stored next to a magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreUnit {
    /// `MM:SS.mmm`
    Time,
    Meters,
    Points,
}

impl ScoreUnit {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "time" => Some(ScoreUnit::Time),
            "meters" => Some(ScoreUnit::Meters),
            "points" => Some(ScoreUnit::Points),
            _ => None,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            ScoreUnit::Time => "time",
            ScoreUnit::Meters => "meters",
            ScoreUnit::Points => "points",
        }
    }
}

/// Canonical magnitude of a result
///
/// Time results serialize as their fixed-width string, numeric results as a
/// JSON number. Numeric values are always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Magnitude {
    Time(RaceTime),
    Numeric(f64),
}

impl Magnitude {
    /// Storage text: `MM:SS.mmm` for times, shortest round-trip decimal otherwise
    pub fn to_storage(&self) -> String {
        match self {
            Magnitude::Time(t) => t.to_string(),
            Magnitude::Numeric(v) => v.to_string(),
        }
    }

    /// Decode storage text according to the record's unit
    pub fn from_storage(unit: ScoreUnit, s: &str) -> Option<Self> {
        match unit {
            ScoreUnit::Time => s.parse().ok().map(Magnitude::Time),
            ScoreUnit::Meters | ScoreUnit::Points => s
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Magnitude::Numeric),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Magnitude::Time(_) => None,
            Magnitude::Numeric(v) => Some(*v),
        }
    }

    pub fn as_time(&self) -> Option<RaceTime> {
        match self {
            Magnitude::Time(t) => Some(*t),
            Magnitude::Numeric(_) => None,
        }
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage())
    }
}

/// Normalizer output: magnitude plus annotations carried from the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreData {
    pub magnitude: Magnitude,
    pub unit: ScoreUnit,
    pub heat_number: Option<HeatNumber>,
    pub lane: Option<u32>,
}

/// One observed input value as entered and as displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptValue {
    pub raw_value: String,
    pub formatted_value: String,
}

/// Observed values keyed by field key
pub type AttemptValues = BTreeMap<String, AttemptValue>;

/// Who a submission scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Competitor {
    Athlete(Uuid),
    Team(Uuid),
}

impl Competitor {
    pub fn id(&self) -> Uuid {
        match self {
            Competitor::Athlete(id) | Competitor::Team(id) => *id,
        }
    }
}

/// Uniqueness key of a score record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub athlete_id: Uuid,
    /// `None` is a key of its own (modalities without heats)
    pub heat_number: Option<HeatNumber>,
}

/// Persisted canonical result for one athlete in one heat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub modality_id: Uuid,
    pub athlete_id: Uuid,
    pub team_id: Option<Uuid>,
    pub heat_number: Option<HeatNumber>,
    pub judge_id: Uuid,
    pub magnitude: Magnitude,
    pub unit: ScoreUnit,
    pub lane: Option<u32>,
    pub attempt_values: AttemptValues,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn key(&self) -> ScoreKey {
        ScoreKey {
            event_id: self.event_id,
            modality_id: self.modality_id,
            athlete_id: self.athlete_id,
            heat_number: self.heat_number,
        }
    }
}

/// Write path taken by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_storage() {
        let t = Magnitude::Time(RaceTime::from_parts(1, 5, 250).unwrap());
        assert_eq!(t.to_storage(), "01:05.250");
        assert_eq!(Magnitude::from_storage(ScoreUnit::Time, "01:05.250"), Some(t));

        let d = Magnitude::Numeric(10.45);
        assert_eq!(d.to_storage(), "10.45");
        assert_eq!(Magnitude::from_storage(ScoreUnit::Meters, "10.45"), Some(d));

        assert_eq!(Magnitude::Numeric(0.0).to_storage(), "0");
        assert_eq!(Magnitude::from_storage(ScoreUnit::Points, "NaN"), None);
        assert_eq!(Magnitude::from_storage(ScoreUnit::Time, "12"), Some(Magnitude::Time(RaceTime::from_millis(12_000).unwrap())));
    }

    #[test]
    fn test_magnitude_json_shape() {
        let t = Magnitude::Time(RaceTime::from_parts(0, 9, 870).unwrap());
        assert_eq!(serde_json::to_value(t).unwrap(), serde_json::json!("00:09.870"));
        assert_eq!(serde_json::to_value(Magnitude::Numeric(7.5)).unwrap(), serde_json::json!(7.5));
    }

    #[test]
    fn test_competitor_json_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(Competitor::Team(id)).unwrap();
        assert_eq!(json["team"], id.to_string());
    }
}
