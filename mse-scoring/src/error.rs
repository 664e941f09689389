//! Error types for mse-scoring
//!
//! Storage errors are split by direction: reads fail with `LookupFailed`,
//! writes with `PersistenceFailed`. Lock contention on either is retried by
//! `db::retry`; anything else goes back to the judge, who retries by
//! submitting again.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the scoring engine
#[derive(Error, Debug)]
pub enum ScoringError {
    /// Read against storage failed
    #[error("Lookup failed ({context}): {source}")]
    LookupFailed {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// Team submission with an empty roster
    #[error("Team {team_id} has no registered members for this event and modality")]
    TeamNotFound { team_id: Uuid },

    /// Write against storage failed; nothing from this call was applied
    #[error("Persistence failed ({context}): {source}")]
    PersistenceFailed {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Modality {modality_id} already has a final heat")]
    DuplicateFinalHeat { modality_id: Uuid },

    #[error("Modality {modality_id} does not allow a final heat")]
    FinalHeatNotAllowed { modality_id: Uuid },

    #[error("Modality {modality_id} is not scored in heats")]
    HeatsDisabled { modality_id: Uuid },

    #[error("Modality not found: {modality_id}")]
    ModalityNotFound { modality_id: Uuid },

    /// Malformed request (not malformed numeric input, which is coerced)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ScoringError {
    /// Adapter for `map_err` on read queries
    pub fn lookup(context: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let context = context.into();
        move |source| ScoringError::LookupFailed { context, source }
    }

    /// Adapter for `map_err` on write queries
    pub fn persistence(context: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let context = context.into();
        move |source| ScoringError::PersistenceFailed { context, source }
    }

    /// Storage failure caused by another connection holding the write lock
    pub fn is_lock_contention(&self) -> bool {
        match self {
            ScoringError::LookupFailed { source, .. }
            | ScoringError::PersistenceFailed { source, .. } => crate::db::retry::is_lock_error(source),
            _ => false,
        }
    }
}

/// Convenience Result type using ScoringError
pub type Result<T> = std::result::Result<T, ScoringError>;

/// Build a decode error for a column that holds unexpected data
pub(crate) fn decode_error(column: &str, detail: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(format!("column {}: {}", column, detail).into())
}
