//! Score normalization
//!
//! Converts a judge's raw form plus the modality's scoring model into a
//! canonical [`ScoreData`]. Normalization never fails: unusable input is
//! replaced by a safe default (`0`, or `00:00.000` for times) and reported as
//! a [`Degradation`] so a malformed form never blocks a save.
//!
//! Recognized form keys, per rule type:
//! - time: `minutes`, `seconds`, `milliseconds`, or `score` (seconds), or
//!   `time` (`MM:SS.mmm` text)
//! - distance: `meters`, `centimeters`, or `score` (meters)
//! - points: `score` (alias `points`)
//! - sets / arrows: `set1..setN` / `arrow1..arrowN`, or `score`
//!
//! When the model uses heats and the form carries `attempt1_*` keys, each
//! `attemptN_` group is read with the same keys and the best attempt wins.
//! `heat` and `lane` are copied into the result when present.

mod draft;
mod fields;
pub(crate) mod form;

pub use draft::{DraftContext, ScoreDraft};
pub use fields::{format_field, observe_attempt_values};

use mse_common::race_time::{RaceTime, ZERO_TIME};
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::model::{
    AttemptValues, HeatNumber, Magnitude, RawForm, RuleType, ScoreData, ScoringModel,
};
use form::FormReader;

/// Why an input value was replaced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradationReason {
    /// No usable value for the result
    Missing,
    NotANumber { value: String },
    NonFinite,
    Negative { value: f64 },
    InvalidTime { value: String },
    /// Time beyond `99:59.999`, which the fixed-width format cannot hold
    TimeOutOfRange { millis: f64 },
    /// Heat or lane that is not a positive integer
    InvalidAnnotation { value: String },
}

impl fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradationReason::Missing => write!(f, "no usable value"),
            DegradationReason::NotANumber { value } => write!(f, "not a number: {:?}", value),
            DegradationReason::NonFinite => write!(f, "not a finite number"),
            DegradationReason::Negative { value } => write!(f, "negative value: {}", value),
            DegradationReason::InvalidTime { value } => write!(f, "invalid time: {:?}", value),
            DegradationReason::TimeOutOfRange { millis } => {
                write!(f, "time of {} ms exceeds {}", millis, RaceTime::MAX)
            }
            DegradationReason::InvalidAnnotation { value } => {
                write!(f, "not a positive integer: {:?}", value)
            }
        }
    }
}

/// A value coerced to a safe default during normalization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub field: String,
    pub reason: DegradationReason,
    /// What was used instead
    pub substituted: String,
}

/// Normalizer result
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub data: ScoreData,
    pub attempt_values: AttemptValues,
    pub degradations: Vec<Degradation>,
}

impl Normalized {
    /// True when any input was coerced
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Normalize a raw form under a scoring model
pub fn normalize(raw: &RawForm, model: &ScoringModel) -> Normalized {
    let mut reader = FormReader::new(raw);

    let per_attempt = model.uses_heats && reader.has_prefix("attempt1_");
    let reading = if per_attempt {
        best_attempt(&mut reader, model.rule_type)
            .or_else(|| read_result(&mut reader, model.rule_type, ""))
    } else {
        read_result(&mut reader, model.rule_type, "")
    };
    let magnitude = finalize(reading, model.rule_type, &mut reader);

    let heat_number = reader.positive_integer("heat").and_then(HeatNumber::new);
    let lane = reader.positive_integer("lane");

    let attempt_values = observe_attempt_values(raw, model);
    let degradations = reader.into_degradations();

    for d in &degradations {
        warn!(
            modality_id = %model.modality_id,
            field = %d.field,
            substituted = %d.substituted,
            "Score input degraded: {}",
            d.reason
        );
    }

    Normalized {
        data: ScoreData {
            magnitude,
            unit: model.rule_type.unit(),
            heat_number,
            lane,
        },
        attempt_values,
        degradations,
    }
}

/// Read one result using keys under `prefix` (`""` or `attemptN_`)
fn read_result(reader: &mut FormReader<'_>, rule: RuleType, prefix: &str) -> Option<Magnitude> {
    let key = |name: &str| format!("{}{}", prefix, name);

    match rule {
        RuleType::Time => read_time(reader, prefix).map(Magnitude::Time),
        RuleType::Distance => {
            let (meters_key, cm_key) = (key("meters"), key("centimeters"));
            if reader.has(&meters_key) || reader.has(&cm_key) {
                let meters = reader.non_negative(&meters_key).unwrap_or(0.0);
                let centimeters = reader.non_negative(&cm_key).unwrap_or(0.0);
                Some(Magnitude::Numeric(meters + centimeters / 100.0))
            } else {
                reader.non_negative(&key("score")).map(Magnitude::Numeric)
            }
        }
        RuleType::Points => reader
            .number(&key("score"))
            .or_else(|| reader.number(&key("points")))
            .map(Magnitude::Numeric),
        RuleType::Sets => sum_series(reader, &key("set"))
            .or_else(|| reader.number(&key("score")))
            .map(Magnitude::Numeric),
        RuleType::Arrows => sum_series(reader, &key("arrow"))
            .or_else(|| reader.number(&key("score")))
            .map(Magnitude::Numeric),
    }
}

fn read_time(reader: &mut FormReader<'_>, prefix: &str) -> Option<RaceTime> {
    let minutes_key = format!("{}minutes", prefix);
    let seconds_key = format!("{}seconds", prefix);
    let millis_key = format!("{}milliseconds", prefix);

    if reader.has(&minutes_key) || reader.has(&seconds_key) || reader.has(&millis_key) {
        let minutes = reader.non_negative(&minutes_key).unwrap_or(0.0);
        let seconds = reader.non_negative(&seconds_key).unwrap_or(0.0);
        let millis = reader.non_negative(&millis_key).unwrap_or(0.0);
        let total = minutes * 60_000.0 + seconds * 1_000.0 + millis;
        return checked_time(reader, &minutes_key, total);
    }

    let score_key = format!("{}score", prefix);
    if let Some(seconds) = reader.non_negative(&score_key) {
        return checked_time(reader, &score_key, seconds * 1_000.0);
    }

    let time_key = format!("{}time", prefix);
    let text = reader.text(&time_key)?;
    match text.parse::<RaceTime>() {
        Ok(t) => Some(t),
        Err(_) => {
            reader.degrade(
                &time_key,
                DegradationReason::InvalidTime { value: text },
                "ignored",
            );
            None
        }
    }
}

/// Race time from a non-negative millisecond total, degraded when it does
/// not fit the fixed-width format
fn checked_time(reader: &mut FormReader<'_>, key: &str, millis: f64) -> Option<RaceTime> {
    let time = RaceTime::from_millis_f64(millis);
    if time.is_none() {
        reader.degrade(key, DegradationReason::TimeOutOfRange { millis }, "ignored");
    }
    time
}

/// Sum of `<base>1`, `<base>2`, ... up to the first absent index
fn sum_series(reader: &mut FormReader<'_>, base: &str) -> Option<f64> {
    let mut index = 1;
    let mut total = None;
    loop {
        let key = format!("{}{}", base, index);
        if !reader.has(&key) {
            break;
        }
        let value = reader.number(&key).unwrap_or(0.0);
        total = Some(total.unwrap_or(0.0) + value);
        index += 1;
    }
    total
}

/// Number of consecutive `attemptN_` groups present, starting at 1
fn attempt_count(reader: &FormReader<'_>) -> u32 {
    let mut n = 0;
    while reader.has_prefix(&format!("attempt{}_", n + 1)) {
        n += 1;
    }
    n
}

/// Best attempt: lowest non-zero time, highest value otherwise
fn best_attempt(reader: &mut FormReader<'_>, rule: RuleType) -> Option<Magnitude> {
    let attempts: Vec<Magnitude> = (1..=attempt_count(reader))
        .filter_map(|n| read_result(reader, rule, &format!("attempt{}_", n)))
        .collect();

    match rule {
        RuleType::Time => {
            let times: Vec<RaceTime> = attempts.iter().filter_map(|m| m.as_time()).collect();
            times
                .iter()
                .copied()
                .filter(|t| !t.is_zero())
                .min()
                .or_else(|| times.first().copied())
                .map(Magnitude::Time)
        }
        RuleType::Distance | RuleType::Points | RuleType::Sets | RuleType::Arrows => attempts
            .iter()
            .filter_map(|m| m.as_f64())
            .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))))
            .map(Magnitude::Numeric),
    }
}

/// Apply the never-null guarantee and canonical rounding
fn finalize(reading: Option<Magnitude>, rule: RuleType, reader: &mut FormReader<'_>) -> Magnitude {
    let primary = match rule {
        RuleType::Time => "time",
        RuleType::Distance => "meters",
        RuleType::Points | RuleType::Sets | RuleType::Arrows => "score",
    };

    match (rule, reading) {
        (RuleType::Time, Some(Magnitude::Time(t))) => Magnitude::Time(t),
        (RuleType::Time, _) => {
            reader.degrade(primary, DegradationReason::Missing, ZERO_TIME);
            Magnitude::Time(RaceTime::ZERO)
        }
        (_, Some(Magnitude::Numeric(v))) if v.is_finite() => {
            let v = if rule == RuleType::Distance {
                // millimeter resolution
                (v * 1000.0).round() / 1000.0
            } else {
                v
            };
            Magnitude::Numeric(v)
        }
        (_, Some(Magnitude::Numeric(_))) => {
            reader.degrade(primary, DegradationReason::NonFinite, "0");
            Magnitude::Numeric(0.0)
        }
        (_, _) => {
            reader.degrade(primary, DegradationReason::Missing, "0");
            Magnitude::Numeric(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScoreUnit, ScoringModel};
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn model(rule_type: RuleType, uses_heats: bool) -> ScoringModel {
        ScoringModel {
            model_id: None,
            modality_id: Uuid::new_v4(),
            rule_type,
            scoring_fields: Vec::new(),
            configuration_fields: Vec::new(),
            uses_heats,
            lane_count: None,
            allows_final_heat: false,
        }
    }

    fn form(v: Value) -> RawForm {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_time_from_components() {
        let n = normalize(
            &form(json!({"minutes": 1, "seconds": 5, "milliseconds": 250})),
            &model(RuleType::Time, false),
        );
        assert_eq!(n.data.magnitude.to_storage(), "01:05.250");
        assert_eq!(n.data.unit, ScoreUnit::Time);
        assert!(!n.is_degraded());
    }

    #[test]
    fn test_time_from_seconds_score() {
        let n = normalize(&form(json!({"score": "62.5"})), &model(RuleType::Time, false));
        assert_eq!(n.data.magnitude.to_storage(), "01:02.500");
    }

    #[test]
    fn test_time_from_formatted_text() {
        let n = normalize(&form(json!({"time": "2:03.4"})), &model(RuleType::Time, false));
        assert_eq!(n.data.magnitude.to_storage(), "02:03.400");
    }

    #[test]
    fn test_time_partial_components() {
        let n = normalize(&form(json!({"seconds": 9})), &model(RuleType::Time, false));
        assert_eq!(n.data.magnitude.to_storage(), "00:09.000");
    }

    // Coercion to the zero time is intentional: a malformed form must not block the save.
    #[test]
    fn test_time_missing_forces_zero_with_warning() {
        let n = normalize(&form(json!({"notes": "dnf"})), &model(RuleType::Time, false));
        assert_eq!(n.data.magnitude.to_storage(), ZERO_TIME);
        assert_eq!(n.degradations.len(), 1);
        assert_eq!(n.degradations[0].reason, DegradationReason::Missing);
        assert_eq!(n.degradations[0].substituted, ZERO_TIME);
    }

    #[test]
    fn test_time_garbage_text_forces_zero() {
        let n = normalize(&form(json!({"time": "fast"})), &model(RuleType::Time, false));
        assert_eq!(n.data.magnitude.to_storage(), ZERO_TIME);
        assert_eq!(n.degradations.len(), 2);
        assert!(matches!(n.degradations[0].reason, DegradationReason::InvalidTime { .. }));
    }

    #[test]
    fn test_time_too_large_forces_zero() {
        let time = model(RuleType::Time, false);

        let n = normalize(&form(json!({"time": "999999999999999:00.000"})), &time);
        assert_eq!(n.data.magnitude.to_storage(), ZERO_TIME);
        assert!(matches!(n.degradations[0].reason, DegradationReason::InvalidTime { .. }));

        let n = normalize(&form(json!({"minutes": 1e300, "seconds": 1})), &time);
        assert_eq!(n.data.magnitude.to_storage(), ZERO_TIME);
        assert_eq!(n.degradations[0].field, "minutes");
        assert!(matches!(n.degradations[0].reason, DegradationReason::TimeOutOfRange { .. }));
        assert_eq!(n.degradations[1].reason, DegradationReason::Missing);

        let n = normalize(&form(json!({"score": 6000})), &time);
        assert_eq!(n.data.magnitude.to_storage(), ZERO_TIME);
        assert!(matches!(n.degradations[0].reason, DegradationReason::TimeOutOfRange { .. }));
    }

    #[test]
    fn test_time_at_upper_bound_is_kept() {
        let n = normalize(
            &form(json!({"minutes": 99, "seconds": 59, "milliseconds": 999})),
            &model(RuleType::Time, false),
        );
        assert_eq!(n.data.magnitude.to_storage(), "99:59.999");
        assert!(!n.is_degraded());
    }

    #[test]
    fn test_time_copies_heat_and_lane() {
        let n = normalize(
            &form(json!({"seconds": 12, "heat": 2, "lane": "4"})),
            &model(RuleType::Time, true),
        );
        assert_eq!(n.data.heat_number, HeatNumber::new(2));
        assert_eq!(n.data.lane, Some(4));
    }

    #[test]
    fn test_distance_composition() {
        let n = normalize(
            &form(json!({"meters": 10, "centimeters": 45})),
            &model(RuleType::Distance, false),
        );
        assert_eq!(n.data.magnitude, Magnitude::Numeric(10.45));
        assert_eq!(n.data.unit, ScoreUnit::Meters);
        assert_eq!(n.data.lane, None);
    }

    #[test]
    fn test_distance_centimeters_only() {
        let n = normalize(&form(json!({"centimeters": "87"})), &model(RuleType::Distance, false));
        assert_eq!(n.data.magnitude, Magnitude::Numeric(0.87));
    }

    #[test]
    fn test_distance_negative_is_degraded() {
        let n = normalize(&form(json!({"meters": -4})), &model(RuleType::Distance, false));
        assert_eq!(n.data.magnitude, Magnitude::Numeric(0.0));
        assert!(n.is_degraded());
    }

    #[test]
    fn test_points_default_zero() {
        let n = normalize(&form(json!({})), &model(RuleType::Points, false));
        assert_eq!(n.data.magnitude, Magnitude::Numeric(0.0));
        assert_eq!(n.data.magnitude.as_f64().map(f64::is_finite), Some(true));
        assert_eq!(n.degradations[0].field, "score");
    }

    #[test]
    fn test_points_non_numeric_is_zero_not_nan() {
        for bad in [json!("abc"), json!("NaN"), json!("inf"), json!([1, 2])] {
            let n = normalize(&form(json!({"score": bad})), &model(RuleType::Points, false));
            assert_eq!(n.data.magnitude, Magnitude::Numeric(0.0));
            assert!(n.is_degraded());
        }
    }

    #[test]
    fn test_points_alias_and_negative_allowed() {
        let n = normalize(&form(json!({"points": -2.5})), &model(RuleType::Points, false));
        assert_eq!(n.data.magnitude, Magnitude::Numeric(-2.5));
        assert!(!n.is_degraded());
    }

    #[test]
    fn test_sets_and_arrows_sum() {
        let n = normalize(
            &form(json!({"set1": 25, "set2": "23", "set3": 15})),
            &model(RuleType::Sets, false),
        );
        assert_eq!(n.data.magnitude, Magnitude::Numeric(63.0));

        let n = normalize(
            &form(json!({"arrow1": 10, "arrow2": 9, "arrow4": 10})),
            &model(RuleType::Arrows, false),
        );
        assert_eq!(n.data.magnitude, Magnitude::Numeric(19.0));
    }

    #[test]
    fn test_per_attempt_distance_keeps_best() {
        let n = normalize(
            &form(json!({
                "attempt1_meters": 6, "attempt1_centimeters": 10,
                "attempt2_meters": 6, "attempt2_centimeters": 72,
                "attempt3_meters": 5
            })),
            &model(RuleType::Distance, true),
        );
        assert_eq!(n.data.magnitude, Magnitude::Numeric(6.72));
    }

    #[test]
    fn test_per_attempt_time_ignores_zero_attempts() {
        let n = normalize(
            &form(json!({
                "attempt1_seconds": 0,
                "attempt2_seconds": 14, "attempt2_milliseconds": 20,
                "attempt3_seconds": 13, "attempt3_milliseconds": 990
            })),
            &model(RuleType::Time, true),
        );
        assert_eq!(n.data.magnitude.to_storage(), "00:13.990");
    }

    #[test]
    fn test_attempt_keys_ignored_without_heats() {
        let n = normalize(
            &form(json!({"attempt1_score": 9, "score": 4})),
            &model(RuleType::Points, false),
        );
        assert_eq!(n.data.magnitude, Magnitude::Numeric(4.0));
    }

    #[test]
    fn test_every_rule_type_yields_finite_default() {
        for rule in RuleType::ALL {
            let n = normalize(&form(json!({"unrelated": "x"})), &model(rule, true));
            match n.data.magnitude {
                Magnitude::Time(t) => assert!(t.is_zero()),
                Magnitude::Numeric(v) => assert_eq!(v, 0.0),
            }
            assert!(n.is_degraded(), "{:?} default must be flagged", rule);
        }
    }
}
