//! Observed attempt values
//!
//! Each scoring field present in the form is kept with the value as typed and
//! the value as it should be displayed back to the judge. The display value
//! is what seeds the edit buffer the next time the row is edited, so it must
//! stay parseable by the normalizer (no unit suffixes).

use mse_common::RaceTime;
use serde_json::Value;

use super::form::{is_present, parse_number, value_to_text};
use crate::model::{
    AttemptValue, AttemptValues, CalcType, CalculatedMeta, FieldMetadata, RawForm, ResultFormat,
    RuleField, ScoringModel, SortOrder,
};

/// Collect observed values for every model field present in the form
///
/// Per-attempt variants of a field (`attempt2_meters` for `meters`) are
/// collected under their own key. Calculated fields are derived from their
/// reference field. A model without scoring fields keeps every scalar entry
/// verbatim.
pub fn observe_attempt_values(raw: &RawForm, model: &ScoringModel) -> AttemptValues {
    let mut observed = AttemptValues::new();

    if model.scoring_fields.is_empty() {
        for (key, value) in raw {
            if is_present(value) && !value.is_object() && !value.is_array() {
                let text = value_to_text(value);
                observed.insert(
                    key.clone(),
                    AttemptValue {
                        raw_value: text.clone(),
                        formatted_value: text.trim().to_string(),
                    },
                );
            }
        }
        return observed;
    }

    for field in &model.scoring_fields {
        if let FieldMetadata::Calculated(meta) = &field.metadata {
            if let Some(value) = calculate(raw, model, meta) {
                observed.insert(field.key.clone(), value);
            }
            continue;
        }

        for (key, value) in raw {
            if !is_present(value) {
                continue;
            }
            if key == &field.key || attempt_base(key) == Some(field.key.as_str()) {
                observed.insert(
                    key.clone(),
                    AttemptValue {
                        raw_value: value_to_text(value),
                        formatted_value: format_field(field, value),
                    },
                );
            }
        }
    }

    observed
}

/// Display form of a value according to its field definition
pub fn format_field(field: &RuleField, value: &Value) -> String {
    let raw = value_to_text(value);

    match &field.metadata {
        FieldMetadata::Numeric(meta) => match finite_number(value) {
            Some(n) => format_decimal(n, meta.step),
            None => raw,
        },
        FieldMetadata::Integer(_) => match finite_number(value) {
            Some(n) => format!("{}", n.round() as i64),
            None => raw,
        },
        FieldMetadata::Text(meta) => match meta.result_format {
            Some(ResultFormat::Time) => as_race_time(value)
                .map(|t| t.to_string())
                .unwrap_or(raw),
            Some(ResultFormat::Distance) => match finite_number(value) {
                Some(n) => format!("{:.2}", n),
                None => raw,
            },
            Some(ResultFormat::Points) => match finite_number(value) {
                Some(n) => n.to_string(),
                None => raw,
            },
            None => raw.trim().to_string(),
        },
        FieldMetadata::Selection(meta) => {
            let trimmed = raw.trim();
            meta.options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(trimmed))
                .cloned()
                .unwrap_or_else(|| trimmed.to_string())
        }
        // Derived values are formatted when they are calculated
        FieldMetadata::Calculated(_) => raw,
    }
}

/// `attempt3_meters` -> `meters`
fn attempt_base(key: &str) -> Option<&str> {
    let rest = key.strip_prefix("attempt")?;
    let (digits, base) = rest.split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || base.is_empty() {
        return None;
    }
    Some(base)
}

fn finite_number(value: &Value) -> Option<f64> {
    parse_number(value).ok().filter(|n| n.is_finite())
}

fn as_race_time(value: &Value) -> Option<RaceTime> {
    match value {
        Value::String(s) => s
            .parse::<RaceTime>()
            .ok()
            .or_else(|| finite_number(value).and_then(RaceTime::from_seconds_f64)),
        _ => finite_number(value).and_then(RaceTime::from_seconds_f64),
    }
}

fn format_decimal(n: f64, step: Option<f64>) -> String {
    match step.and_then(step_decimals) {
        Some(decimals) => format!("{:.*}", decimals, n),
        None => n.to_string(),
    }
}

/// Decimal places implied by an input step (`0.01` -> 2, `1` -> 0)
fn step_decimals(step: f64) -> Option<usize> {
    if !step.is_finite() || step <= 0.0 {
        return None;
    }
    let text = step.to_string();
    Some(text.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0))
}

/// Derive a calculated field from the values of its reference field
///
/// Only values inside this submission are visible here, so `rank` (which
/// needs the other competitors) is left to the leaderboard.
fn calculate(raw: &RawForm, model: &ScoringModel, meta: &CalculatedMeta) -> Option<AttemptValue> {
    if meta.reference_field.is_empty() {
        return None;
    }

    let reference = model.field(&meta.reference_field);
    let is_time = matches!(
        reference.map(|f| &f.metadata),
        Some(FieldMetadata::Text(t)) if t.result_format == Some(ResultFormat::Time)
    );

    let values: Vec<f64> = raw
        .iter()
        .filter(|(k, v)| {
            is_present(v)
                && (k.as_str() == meta.reference_field
                    || attempt_base(k) == Some(meta.reference_field.as_str()))
        })
        .filter_map(|(_, v)| {
            if is_time {
                as_race_time(v).map(|t| t.total_millis() as f64 / 1000.0)
            } else {
                finite_number(v)
            }
        })
        .collect();

    if values.is_empty() {
        return None;
    }

    let result = match meta.calc_type {
        CalcType::Best => match meta.sort_order {
            SortOrder::Asc => values.iter().copied().fold(f64::INFINITY, f64::min),
            SortOrder::Desc => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        },
        CalcType::Sum => values.iter().sum(),
        CalcType::Average => values.iter().sum::<f64>() / values.len() as f64,
        CalcType::Rank => return None,
    };

    let formatted = if is_time {
        RaceTime::from_seconds_f64(result)
            .map(|t| t.to_string())
            .unwrap_or_else(|| result.to_string())
    } else {
        ((result * 1000.0).round() / 1000.0).to_string()
    };

    Some(AttemptValue {
        raw_value: result.to_string(),
        formatted_value: formatted,
    })
}
