//! Structured `{value, unit}` delays between sequence steps.
//!
//! Older drafts stored delays as free text such as `"2-3 days"`. Those are
//! read through [`Delay::normalize`], which keeps the lower bound of a range
//! and falls back to [`DEFAULT_DELAY`] instead of failing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

impl DelayUnit {
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            Self::Hours => "hour",
            Self::Days => "day",
            Self::Weeks => "week",
            Self::Months => "month",
        }
    }

    /// Singular or plural unit word, any case.
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim().to_ascii_lowercase();
        let stem = word.strip_suffix('s').unwrap_or(&word);
        match stem {
            "hour" => Some(Self::Hours),
            "day" => Some(Self::Days),
            "week" => Some(Self::Weeks),
            "month" => Some(Self::Months),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delay {
    pub value: u32,
    pub unit: DelayUnit,
}

pub const DEFAULT_DELAY: Delay = Delay {
    value: 3,
    unit: DelayUnit::Days,
};

/// A delay as persisted: either already structured or legacy free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDelay {
    Structured { value: i64, unit: String },
    Legacy(String),
}

impl From<Delay> for RawDelay {
    fn from(delay: Delay) -> Self {
        RawDelay::Structured {
            value: i64::from(delay.value),
            unit: delay.unit.plural().to_string(),
        }
    }
}

impl From<&str> for RawDelay {
    fn from(text: &str) -> Self {
        RawDelay::Legacy(text.to_string())
    }
}

fn legacy_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d+)(?:\s*-\s*\d+)?\s*(hour|day|week|month)s?\b")
            .expect("legacy delay pattern is valid")
    })
}

impl Delay {
    pub const fn new(value: u32, unit: DelayUnit) -> Self {
        Self { value, unit }
    }

    pub const fn days(value: u32) -> Self {
        Self::new(value, DelayUnit::Days)
    }

    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    /// Parses `<int>[-<int>] <unit-word>`; a range keeps its lower bound.
    pub fn parse_legacy(text: &str) -> Option<Self> {
        let caps = legacy_pattern().captures(text)?;
        let value: u32 = caps[1].parse().ok()?;
        let unit = DelayUnit::from_word(&caps[2])?;
        Some(Self::new(value, unit)).filter(Delay::is_positive)
    }

    pub fn normalize(raw: &RawDelay) -> Self {
        let parsed = match raw {
            RawDelay::Structured { value, unit } => u32::try_from(*value)
                .ok()
                .zip(DelayUnit::from_word(unit))
                .map(|(value, unit)| Self::new(value, unit))
                .filter(Delay::is_positive),
            RawDelay::Legacy(text) => Self::parse_legacy(text),
        };

        parsed.unwrap_or_else(|| {
            tracing::debug!("Unrecognised delay {:?}, using default {}", raw, DEFAULT_DELAY);
            DEFAULT_DELAY
        })
    }
}

impl Default for Delay {
    fn default() -> Self {
        DEFAULT_DELAY
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.value == 1 {
            self.unit.singular()
        } else {
            self.unit.plural()
        };
        write!(f, "{} {}", self.value, unit)
    }
}

pub fn normalize(raw: &RawDelay) -> Delay {
    Delay::normalize(raw)
}

pub fn format(delay: &Delay) -> String {
    delay.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_singularizes_one() {
        assert_eq!(format(&Delay::days(1)), "1 day");
        assert_eq!(format(&Delay::days(3)), "3 days");
        assert_eq!(format(&Delay::new(1, DelayUnit::Months)), "1 month");
        assert_eq!(format(&Delay::new(2, DelayUnit::Hours)), "2 hours");
    }

    #[test]
    fn test_legacy_strings() {
        assert_eq!(normalize(&"5 days".into()), Delay::days(5));
        assert_eq!(normalize(&"1 Week".into()), Delay::new(1, DelayUnit::Weeks));
        assert_eq!(normalize(&"12 HOURS".into()), Delay::new(12, DelayUnit::Hours));
        assert_eq!(normalize(&"wait 2 months".into()), Delay::new(2, DelayUnit::Months));
    }

    #[test]
    fn test_range_keeps_lower_bound() {
        assert_eq!(normalize(&"2-3 days".into()), Delay::days(2));
        assert_eq!(normalize(&"1 - 2 weeks".into()), Delay::new(1, DelayUnit::Weeks));
    }

    #[test]
    fn test_unparseable_falls_back_to_default() {
        assert_eq!(normalize(&"soon".into()), DEFAULT_DELAY);
        assert_eq!(normalize(&"3 fortnights".into()), DEFAULT_DELAY);
        assert_eq!(normalize(&"0 days".into()), DEFAULT_DELAY);
        assert_eq!(normalize(&"".into()), DEFAULT_DELAY);
    }

    #[test]
    fn test_structured_passthrough() {
        let raw = RawDelay::Structured {
            value: 2,
            unit: "weeks".to_string(),
        };
        assert_eq!(normalize(&raw), Delay::new(2, DelayUnit::Weeks));

        let singular = RawDelay::Structured {
            value: 4,
            unit: "Hour".to_string(),
        };
        assert_eq!(normalize(&singular), Delay::new(4, DelayUnit::Hours));
    }

    #[test]
    fn test_malformed_structured_falls_back() {
        let negative = RawDelay::Structured {
            value: -1,
            unit: "days".to_string(),
        };
        let bad_unit = RawDelay::Structured {
            value: 2,
            unit: "years".to_string(),
        };
        assert_eq!(normalize(&negative), DEFAULT_DELAY);
        assert_eq!(normalize(&bad_unit), DEFAULT_DELAY);
    }

    #[test]
    fn test_round_trip_through_format() {
        for unit in [DelayUnit::Hours, DelayUnit::Days, DelayUnit::Weeks, DelayUnit::Months] {
            for value in [1, 2, 7, 30] {
                let delay = Delay::new(value, unit);
                assert_eq!(normalize(&RawDelay::Legacy(format(&delay))), delay);
                assert_eq!(normalize(&RawDelay::from(delay)), delay);
            }
        }

        for legacy in ["2-3 days", "1 week", "6 Hours", "1 month"] {
            let once = normalize(&legacy.into());
            assert_eq!(normalize(&RawDelay::Legacy(format(&once))), once);
        }
    }

    #[test]
    fn test_raw_delay_deserializes_both_shapes() {
        let structured: RawDelay =
            serde_json::from_value(serde_json::json!({"value": 1, "unit": "weeks"})).unwrap();
        let legacy: RawDelay = serde_json::from_value(serde_json::json!("3-5 days")).unwrap();

        assert_eq!(normalize(&structured), Delay::new(1, DelayUnit::Weeks));
        assert_eq!(normalize(&legacy), Delay::days(3));
    }
}
