//! Domain types shared by the normalizer, coordinator and heat lifecycle

pub mod heat;
pub mod rules;
pub mod score;

pub use heat::{Heat, HeatNumber};
pub use rules::{
    CalcScope, CalcType, CalculatedMeta, ConfigurationField, FieldMetadata, InputKind,
    ModalityMeta, NumericMeta, ResultFormat, RuleField, RuleType, ScoringModel, SelectionMeta,
    SortOrder, TextMeta,
};
pub use score::{
    AttemptValue, AttemptValues, Competitor, Magnitude, Operation, RawForm, ScoreData, ScoreKey,
    ScoreRecord, ScoreUnit,
};
