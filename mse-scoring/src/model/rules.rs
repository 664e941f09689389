//! Scoring rule model
//!
//! Per-modality scoring configuration as published by the rule catalog.
//! Field kinds and rule types are closed enums; every consumer matches on them
//! exhaustively, so adding a variant fails to compile until each normalizer
//! and formatter handles it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::score::ScoreUnit;

/// How a modality's results are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Elapsed time, lower is better
    Time,
    /// Distance in meters, higher is better
    Distance,
    /// Raw points, higher is better
    Points,
    /// Sum of per-set points
    Sets,
    /// Sum of per-arrow points
    Arrows,
}

impl RuleType {
    pub const ALL: [RuleType; 5] = [
        RuleType::Time,
        RuleType::Distance,
        RuleType::Points,
        RuleType::Sets,
        RuleType::Arrows,
    ];

    /// Parse from catalog string representation (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "time" | "tempo" => Some(RuleType::Time),
            "distance" | "distancia" => Some(RuleType::Distance),
            "points" | "pontos" => Some(RuleType::Points),
            "sets" => Some(RuleType::Sets),
            "arrows" => Some(RuleType::Arrows),
            _ => None,
        }
    }

    /// Canonical database value
    pub fn to_db_string(&self) -> &'static str {
        match self {
            RuleType::Time => "time",
            RuleType::Distance => "distance",
            RuleType::Points => "points",
            RuleType::Sets => "sets",
            RuleType::Arrows => "arrows",
        }
    }

    /// Unit tag stored alongside the canonical magnitude
    pub fn unit(&self) -> ScoreUnit {
        match self {
            RuleType::Time => ScoreUnit::Time,
            RuleType::Distance => ScoreUnit::Meters,
            RuleType::Points | RuleType::Sets | RuleType::Arrows => ScoreUnit::Points,
        }
    }

    /// Whether a smaller magnitude ranks higher
    pub fn lower_is_better(&self) -> bool {
        matches!(self, RuleType::Time)
    }
}

/// Input widget kind of a scoring field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Numeric,
    Integer,
    Text,
    Selection,
    Calculated,
}

impl InputKind {
    pub const ALL: [InputKind; 5] = [
        InputKind::Numeric,
        InputKind::Integer,
        InputKind::Text,
        InputKind::Selection,
        InputKind::Calculated,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "numeric" | "number" => Some(InputKind::Numeric),
            "integer" => Some(InputKind::Integer),
            "text" => Some(InputKind::Text),
            "selection" | "select" => Some(InputKind::Selection),
            "calculated" => Some(InputKind::Calculated),
            _ => None,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            InputKind::Numeric => "numeric",
            InputKind::Integer => "integer",
            InputKind::Text => "text",
            InputKind::Selection => "selection",
            InputKind::Calculated => "calculated",
        }
    }
}

/// Display mask applied to a free-text result field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    Time,
    Distance,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcType {
    #[default]
    Best,
    Sum,
    Average,
    /// Position among other results in the scope; resolved by leaderboards
    Rank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcScope {
    #[default]
    Heat,
    Modality,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericMeta {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextMeta {
    pub result_format: Option<ResultFormat>,
    pub display_unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionMeta {
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatedMeta {
    pub calc_type: CalcType,
    pub reference_field: String,
    pub scope: CalcScope,
    pub sort_order: SortOrder,
}

/// Kind-specific field metadata; the variant determines the input kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input_kind", content = "metadata", rename_all = "lowercase")]
pub enum FieldMetadata {
    Numeric(NumericMeta),
    Integer(NumericMeta),
    Text(TextMeta),
    Selection(SelectionMeta),
    Calculated(CalculatedMeta),
}

impl FieldMetadata {
    pub fn input_kind(&self) -> InputKind {
        match self {
            FieldMetadata::Numeric(_) => InputKind::Numeric,
            FieldMetadata::Integer(_) => InputKind::Integer,
            FieldMetadata::Text(_) => InputKind::Text,
            FieldMetadata::Selection(_) => InputKind::Selection,
            FieldMetadata::Calculated(_) => InputKind::Calculated,
        }
    }

    /// Decode catalog metadata JSON for the given kind
    pub fn from_json(kind: InputKind, json: &str) -> Result<Self, serde_json::Error> {
        let json = if json.trim().is_empty() { "{}" } else { json };
        Ok(match kind {
            InputKind::Numeric => FieldMetadata::Numeric(serde_json::from_str(json)?),
            InputKind::Integer => FieldMetadata::Integer(serde_json::from_str(json)?),
            InputKind::Text => FieldMetadata::Text(serde_json::from_str(json)?),
            InputKind::Selection => FieldMetadata::Selection(serde_json::from_str(json)?),
            InputKind::Calculated => FieldMetadata::Calculated(serde_json::from_str(json)?),
        })
    }

    /// Encode the kind-specific payload (without the kind tag) for storage
    pub fn to_json(&self) -> String {
        let value = match self {
            FieldMetadata::Numeric(m) | FieldMetadata::Integer(m) => serde_json::to_value(m),
            FieldMetadata::Text(m) => serde_json::to_value(m),
            FieldMetadata::Selection(m) => serde_json::to_value(m),
            FieldMetadata::Calculated(m) => serde_json::to_value(m),
        };
        value
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// Empty metadata for a kind
    pub fn empty(kind: InputKind) -> Self {
        match kind {
            InputKind::Numeric => FieldMetadata::Numeric(NumericMeta::default()),
            InputKind::Integer => FieldMetadata::Integer(NumericMeta::default()),
            InputKind::Text => FieldMetadata::Text(TextMeta::default()),
            InputKind::Selection => FieldMetadata::Selection(SelectionMeta::default()),
            InputKind::Calculated => FieldMetadata::Calculated(CalculatedMeta::default()),
        }
    }
}

/// A judge-entered input definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleField {
    pub key: String,
    pub label: String,
    pub required: bool,
    pub display_order: i64,
    #[serde(flatten)]
    pub metadata: FieldMetadata,
}

impl RuleField {
    pub fn input_kind(&self) -> InputKind {
        self.metadata.input_kind()
    }
}

/// A model-level switch (attempt count, unit hints, ...)
///
/// Stored in the catalog next to scoring fields but never rendered as an
/// input and never normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationField {
    pub key: String,
    pub value: String,
}

/// Modality-level flags from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityMeta {
    pub modality_id: Uuid,
    pub name: String,
    pub rule_type: RuleType,
    pub uses_heats: bool,
    pub lane_count: Option<u32>,
    pub allows_final_heat: bool,
    pub is_team: bool,
}

/// A sport's scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringModel {
    /// `None` when the modality has no authored model and the engine falls
    /// back to its rule type alone
    pub model_id: Option<Uuid>,
    pub modality_id: Uuid,
    pub rule_type: RuleType,
    /// Ordered by `display_order`
    pub scoring_fields: Vec<RuleField>,
    pub configuration_fields: Vec<ConfigurationField>,
    pub uses_heats: bool,
    pub lane_count: Option<u32>,
    pub allows_final_heat: bool,
}

impl ScoringModel {
    /// Field-less model derived from modality flags
    pub fn fallback(meta: &ModalityMeta) -> Self {
        Self {
            model_id: None,
            modality_id: meta.modality_id,
            rule_type: meta.rule_type,
            scoring_fields: Vec::new(),
            configuration_fields: Vec::new(),
            uses_heats: meta.uses_heats,
            lane_count: meta.lane_count,
            allows_final_heat: meta.allows_final_heat,
        }
    }

    pub fn field(&self, key: &str) -> Option<&RuleField> {
        self.scoring_fields.iter().find(|f| f.key == key)
    }

    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.configuration_fields
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type_roundtrip() {
        for rule in RuleType::ALL {
            assert_eq!(RuleType::from_str(rule.to_db_string()), Some(rule));
        }
        assert_eq!(RuleType::from_str(" TEMPO "), Some(RuleType::Time));
        assert_eq!(RuleType::from_str("judged"), None);
    }

    #[test]
    fn test_units() {
        assert_eq!(RuleType::Time.unit(), ScoreUnit::Time);
        assert_eq!(RuleType::Distance.unit(), ScoreUnit::Meters);
        assert_eq!(RuleType::Arrows.unit(), ScoreUnit::Points);
        assert!(RuleType::Time.lower_is_better());
        assert!(!RuleType::Points.lower_is_better());
    }

    #[test]
    fn test_every_input_kind_has_metadata() {
        for kind in InputKind::ALL {
            let meta = FieldMetadata::empty(kind);
            assert_eq!(meta.input_kind(), kind);
            let decoded = FieldMetadata::from_json(kind, &meta.to_json()).unwrap();
            assert_eq!(decoded, meta);
            assert_eq!(InputKind::from_str(kind.to_db_string()), Some(kind));
        }
    }

    #[test]
    fn test_metadata_from_catalog_json() {
        let meta = FieldMetadata::from_json(
            InputKind::Calculated,
            r#"{"calc_type":"sum","reference_field":"arrow","scope":"event","sort_order":"desc"}"#,
        )
        .unwrap();
        match meta {
            FieldMetadata::Calculated(c) => {
                assert_eq!(c.calc_type, CalcType::Sum);
                assert_eq!(c.reference_field, "arrow");
                assert_eq!(c.scope, CalcScope::Event);
                assert_eq!(c.sort_order, SortOrder::Desc);
            }
            other => panic!("unexpected metadata {:?}", other),
        }

        assert!(matches!(
            FieldMetadata::from_json(InputKind::Numeric, "").unwrap(),
            FieldMetadata::Numeric(NumericMeta { min: None, max: None, step: None })
        ));
    }

    #[test]
    fn test_rule_field_serializes_kind_flat() {
        let field = RuleField {
            key: "meters".to_string(),
            label: "Meters".to_string(),
            required: true,
            display_order: 1,
            metadata: FieldMetadata::Integer(NumericMeta {
                min: Some(0.0),
                max: None,
                step: Some(1.0),
            }),
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["input_kind"], "integer");
        assert_eq!(json["metadata"]["step"], 1.0);

        let back: RuleField = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }
}
