//! Heat (battery) numbering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A heat number: 1..N for regular heats, 999 for the modality's final
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HeatNumber(u32);

impl HeatNumber {
    /// Reserved number of the final heat
    pub const FINAL: HeatNumber = HeatNumber(999);

    /// Returns `None` for zero
    pub fn new(number: u32) -> Option<Self> {
        if number == 0 {
            None
        } else {
            Some(Self(number))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn is_final(&self) -> bool {
        *self == Self::FINAL
    }

    /// "Final" for the reserved heat, otherwise the numeral
    pub fn display_name(&self) -> String {
        if self.is_final() {
            "Final".to_string()
        } else {
            self.0.to_string()
        }
    }
}

impl fmt::Display for HeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for HeatNumber {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        HeatNumber::new(value).ok_or_else(|| "heat number must be positive".to_string())
    }
}

impl From<HeatNumber> for u32 {
    fn from(h: HeatNumber) -> Self {
        h.0
    }
}

/// A heat of a modality with its derived athlete count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heat {
    pub modality_id: Uuid,
    pub number: HeatNumber,
    pub display_name: String,
    /// Athletes with a score recorded in this heat
    pub athlete_count: u32,
    pub created_at: DateTime<Utc>,
}
