//! Fixed-width race time formatting
//!
//! Time-based results are persisted as `MM:SS.mmm` strings (two-digit minutes,
//! two-digit seconds, three-digit milliseconds). Leaderboards and reports sort
//! these lexically, so every writer must go through [`RaceTime`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical zero time, used when a time submission carries no usable value
pub const ZERO_TIME: &str = "00:00.000";

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60_000;

/// Largest representable time, `99:59.999`
const MAX_MILLIS: u64 = 99 * MILLIS_PER_MINUTE + 59 * MILLIS_PER_SECOND + 999;

/// A race time with millisecond resolution
///
/// Displays as `MM:SS.mmm`. Values are capped at `99:59.999` so the text
/// form stays fixed-width; constructors return `None` (and parsing fails)
/// beyond that.
///
/// # Examples
///
/// ```
/// use mse_common::race_time::RaceTime;
///
/// let t = RaceTime::from_parts(1, 5, 250).unwrap();
/// assert_eq!(t.to_string(), "01:05.250");
/// assert_eq!(t.total_millis(), 65_250);
///
/// let parsed: RaceTime = "01:05.250".parse().unwrap();
/// assert_eq!(parsed, t);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RaceTime(u64);

impl RaceTime {
    /// Zero time (`00:00.000`)
    pub const ZERO: RaceTime = RaceTime(0);

    /// Longest time that keeps two minute digits (`99:59.999`)
    pub const MAX: RaceTime = RaceTime(MAX_MILLIS);

    /// Build from a total number of milliseconds
    pub fn from_millis(millis: u64) -> Option<Self> {
        (millis <= MAX_MILLIS).then_some(Self(millis))
    }

    /// Build from discrete components
    ///
    /// Components are not required to be in range: `(0, 75, 0)` is the same
    /// time as `(1, 15, 0)`. Returns `None` when the total exceeds
    /// [`RaceTime::MAX`].
    pub fn from_parts(minutes: u64, seconds: u64, millis: u64) -> Option<Self> {
        let total = minutes
            .checked_mul(MILLIS_PER_MINUTE)?
            .checked_add(seconds.checked_mul(MILLIS_PER_SECOND)?)?
            .checked_add(millis)?;
        Self::from_millis(total)
    }

    /// Build from fractional seconds, rounding to the nearest millisecond
    ///
    /// Returns `None` for negative, non-finite or out-of-range input.
    pub fn from_seconds_f64(seconds: f64) -> Option<Self> {
        Self::from_millis_f64(seconds * 1000.0)
    }

    /// Build from fractional milliseconds, rounding to the nearest one
    ///
    /// Returns `None` for negative, non-finite or out-of-range input.
    pub fn from_millis_f64(millis: f64) -> Option<Self> {
        if !millis.is_finite() || millis < 0.0 {
            return None;
        }
        let rounded = millis.round();
        if rounded > MAX_MILLIS as f64 {
            return None;
        }
        Some(Self(rounded as u64))
    }

    pub fn total_millis(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn minutes(&self) -> u64 {
        self.0 / MILLIS_PER_MINUTE
    }

    pub fn seconds(&self) -> u64 {
        (self.0 % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND
    }

    pub fn millis(&self) -> u64 {
        self.0 % MILLIS_PER_SECOND
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}.{:03}", self.minutes(), self.seconds(), self.millis())
    }
}

/// Error returned when a string is not a valid race time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid race time: {0:?}")]
pub struct ParseRaceTimeError(pub String);

impl FromStr for RaceTime {
    type Err = ParseRaceTimeError;

    /// Accepts `MM:SS.mmm`, `M:SS.mmm`, `MM:SS`, and `SS.mmm`.
    ///
    /// Fractions shorter than three digits are right-padded (`1:05.25` is
    /// 1 minute, 5 seconds, 250 milliseconds).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRaceTimeError(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(err());
        }

        let (minutes_part, rest) = match trimmed.split_once(':') {
            Some((m, r)) => (Some(m), r),
            None => (None, trimmed),
        };
        let (seconds_part, fraction_part) = match rest.split_once('.') {
            Some((s, f)) => (s, Some(f)),
            None => (rest, None),
        };

        let minutes = match minutes_part {
            Some(m) => parse_digits(m).ok_or_else(err)?,
            None => 0,
        };
        let seconds = parse_digits(seconds_part).ok_or_else(err)?;
        if minutes_part.is_some() && seconds >= 60 {
            return Err(err());
        }

        let millis = match fraction_part {
            Some(f) if !f.is_empty() && f.len() <= 3 => {
                let digits = parse_digits(f).ok_or_else(err)?;
                digits * 10u64.pow(3 - f.len() as u32)
            }
            Some(_) => return Err(err()),
            None => 0,
        };

        RaceTime::from_parts(minutes, seconds, millis).ok_or_else(err)
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl From<RaceTime> for String {
    fn from(t: RaceTime) -> Self {
        t.to_string()
    }
}

impl TryFrom<String> for RaceTime {
    type Error = ParseRaceTimeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_padding() {
        assert_eq!(RaceTime::ZERO.to_string(), ZERO_TIME);
        assert_eq!(RaceTime::from_parts(0, 9, 7).unwrap().to_string(), "00:09.007");
        assert_eq!(RaceTime::from_parts(12, 34, 567).unwrap().to_string(), "12:34.567");
    }

    #[test]
    fn test_components_overflow_carry() {
        assert_eq!(RaceTime::from_parts(0, 75, 1500).unwrap().to_string(), "01:16.500");
    }

    #[test]
    fn test_capped_at_two_minute_digits() {
        assert_eq!(RaceTime::MAX.to_string(), "99:59.999");
        assert_eq!(RaceTime::from_parts(99, 59, 999), Some(RaceTime::MAX));
        assert!(RaceTime::from_parts(100, 0, 0).is_none());
        assert!(RaceTime::from_millis(RaceTime::MAX.total_millis() + 1).is_none());
        assert!(RaceTime::from_seconds_f64(6000.0).is_none());
        assert!("100:00.000".parse::<RaceTime>().is_err());
    }

    #[test]
    fn test_huge_components_do_not_overflow() {
        assert!(RaceTime::from_parts(u64::MAX, 0, 0).is_none());
        assert!(RaceTime::from_parts(0, u64::MAX, 0).is_none());
        assert!(RaceTime::from_parts(0, 0, u64::MAX).is_none());
        assert!(RaceTime::from_millis_f64(1e30).is_none());
        assert!("999999999999999:00.000".parse::<RaceTime>().is_err());
        assert!("99999999999999999999999:00.000".parse::<RaceTime>().is_err());
    }

    #[test]
    fn test_from_seconds() {
        assert_eq!(RaceTime::from_seconds_f64(65.25).unwrap().to_string(), "01:05.250");
        assert_eq!(RaceTime::from_seconds_f64(9.9996).unwrap().to_string(), "00:10.000");
        assert!(RaceTime::from_seconds_f64(-1.0).is_none());
        assert!(RaceTime::from_seconds_f64(f64::NAN).is_none());
        assert!(RaceTime::from_seconds_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!("1:05.250".parse::<RaceTime>().unwrap().total_millis(), 65_250);
        assert_eq!("01:05.25".parse::<RaceTime>().unwrap().total_millis(), 65_250);
        assert_eq!("01:05".parse::<RaceTime>().unwrap().total_millis(), 65_000);
        assert_eq!("12.5".parse::<RaceTime>().unwrap().total_millis(), 12_500);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<RaceTime>().is_err());
        assert!("ab:cd.efg".parse::<RaceTime>().is_err());
        assert!("01:75.000".parse::<RaceTime>().is_err());
        assert!("01:05.2500".parse::<RaceTime>().is_err());
        assert!("-01:05.000".parse::<RaceTime>().is_err());
    }

    #[test]
    fn test_lexical_order_matches_numeric_order() {
        let mut times = vec![
            RaceTime::from_parts(1, 2, 3).unwrap(),
            RaceTime::from_parts(0, 59, 999).unwrap(),
            RaceTime::from_parts(10, 0, 0).unwrap(),
            RaceTime::from_parts(0, 5, 0).unwrap(),
            RaceTime::MAX,
        ];
        let mut strings: Vec<String> = times.iter().map(|t| t.to_string()).collect();
        times.sort();
        strings.sort();
        let sorted: Vec<String> = times.iter().map(|t| t.to_string()).collect();
        assert_eq!(sorted, strings);
    }

    #[test]
    fn test_serde_as_string() {
        let t = RaceTime::from_parts(2, 3, 4).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"02:03.004\"");
        let back: RaceTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
