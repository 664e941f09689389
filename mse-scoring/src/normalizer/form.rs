//! Reading typed values out of a raw judge form
//!
//! Nothing here fails. Unusable values are recorded as degradations and
//! treated as absent, so the caller decides which safe default applies.

use serde_json::Value;

use super::{Degradation, DegradationReason};
use crate::model::RawForm;

pub(crate) struct FormReader<'a> {
    form: &'a RawForm,
    degradations: Vec<Degradation>,
}

impl<'a> FormReader<'a> {
    pub(crate) fn new(form: &'a RawForm) -> Self {
        Self {
            form,
            degradations: Vec::new(),
        }
    }

    /// Value for `key`, ignoring nulls and blank strings
    pub(crate) fn value(&self, key: &str) -> Option<&'a Value> {
        self.form.get(key).filter(|v| is_present(v))
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    pub(crate) fn has_prefix(&self, prefix: &str) -> bool {
        self.form
            .iter()
            .any(|(k, v)| k.starts_with(prefix) && is_present(v))
    }

    /// Finite number at `key`
    pub(crate) fn number(&mut self, key: &str) -> Option<f64> {
        let value = self.value(key)?;
        match parse_number(value) {
            Ok(n) if n.is_finite() => Some(n),
            Ok(_) => {
                self.degrade(key, DegradationReason::NonFinite, "ignored");
                None
            }
            Err(raw) => {
                self.degrade(key, DegradationReason::NotANumber { value: raw }, "ignored");
                None
            }
        }
    }

    /// Finite, non-negative number at `key`
    pub(crate) fn non_negative(&mut self, key: &str) -> Option<f64> {
        let n = self.number(key)?;
        if n < 0.0 {
            self.degrade(key, DegradationReason::Negative { value: n }, "ignored");
            return None;
        }
        Some(n)
    }

    /// Positive integer at `key` (heat and lane annotations)
    pub(crate) fn positive_integer(&mut self, key: &str) -> Option<u32> {
        let value = self.value(key)?;
        match parse_number(value) {
            Ok(n) if n.is_finite() && n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
                Some(n as u32)
            }
            _ => {
                self.degrade(
                    key,
                    DegradationReason::InvalidAnnotation {
                        value: value_to_text(value),
                    },
                    "ignored",
                );
                None
            }
        }
    }

    pub(crate) fn text(&self, key: &str) -> Option<String> {
        self.value(key).map(|v| value_to_text(v).trim().to_string())
    }

    pub(crate) fn degrade(&mut self, field: &str, reason: DegradationReason, substituted: &str) {
        self.degradations.push(Degradation {
            field: field.to_string(),
            reason,
            substituted: substituted.to_string(),
        });
    }

    pub(crate) fn into_degradations(self) -> Vec<Degradation> {
        self.degradations
    }
}

pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Parse a JSON number or numeric string; a comma decimal separator is accepted
///
/// Returns the offending text on failure.
pub(crate) fn parse_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| n.to_string()),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', ".");
            cleaned.parse::<f64>().map_err(|_| s.clone())
        }
        other => Err(value_to_text(other)),
    }
}

/// Text form of a scalar value as the judge entered it
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(v: Value) -> RawForm {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number(&json!(3)), Ok(3.0));
        assert_eq!(parse_number(&json!("4,5")), Ok(4.5));
        assert_eq!(parse_number(&json!(" 12.25 ")), Ok(12.25));
        assert_eq!(parse_number(&json!("abc")), Err("abc".to_string()));
        assert!(parse_number(&json!(true)).is_err());
    }

    #[test]
    fn test_blank_values_are_absent() {
        let raw = form(json!({"a": "", "b": null, "c": "  ", "d": 0}));
        let reader = FormReader::new(&raw);
        assert!(!reader.has("a"));
        assert!(!reader.has("b"));
        assert!(!reader.has("c"));
        assert!(reader.has("d"));
    }

    #[test]
    fn test_bad_number_is_recorded() {
        let raw = form(json!({"seconds": "1O", "minutes": "NaN", "meters": -3}));
        let mut reader = FormReader::new(&raw);
        assert_eq!(reader.number("seconds"), None);
        assert_eq!(reader.number("minutes"), None);
        assert_eq!(reader.non_negative("meters"), None);

        let degradations = reader.into_degradations();
        assert_eq!(degradations.len(), 3);
        assert!(matches!(degradations[0].reason, DegradationReason::NotANumber { .. }));
        assert!(matches!(degradations[1].reason, DegradationReason::NonFinite));
        assert!(matches!(degradations[2].reason, DegradationReason::Negative { .. }));
    }

    #[test]
    fn test_positive_integer() {
        let raw = form(json!({"heat": "2", "lane": 0, "bad": 1.5}));
        let mut reader = FormReader::new(&raw);
        assert_eq!(reader.positive_integer("heat"), Some(2));
        assert_eq!(reader.positive_integer("lane"), None);
        assert_eq!(reader.positive_integer("bad"), None);
        assert_eq!(reader.positive_integer("missing"), None);
        assert_eq!(reader.into_degradations().len(), 2);
    }
}
