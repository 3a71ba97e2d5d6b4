//! Human-readable duration fields.
//!
//! Timeouts and intervals are written as humantime strings ("30m",
//! "2h 15m") in both the YAML document and the env channel. The zero
//! duration means "unset"; the validator replaces it with the field's
//! default and echoes the final value into the read-only `*-string`
//! companion field.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A duration serialized as a humantime string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub const fn zero() -> Self {
        Self(Duration::ZERO)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn is_zero(&self) -> bool {
        self.0.as_nanos() == 0
    }

    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Replace an unset (zero) duration with the given default.
    pub fn or_default(self, default: Self) -> Self {
        if self.is_zero() {
            default
        } else {
            self
        }
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl FromStr for HumanDuration {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::zero());
        }
        humantime::parse_duration(s).map(Self)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_zero() {
            serializer.serialize_str("")
        } else {
            serializer.serialize_str(&self.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: a CI env block sets `...-TIMEOUT=30m` and the value
    /// round-trips through the document unchanged.
    #[test]
    fn story_humantime_round_trip() {
        let d: HumanDuration = "30m".parse().unwrap();
        assert_eq!(d.as_duration(), Duration::from_secs(30 * 60));
        assert_eq!(d.to_string(), "30m");

        let yaml = serde_yaml::to_string(&d).unwrap();
        let back: HumanDuration = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, d);
    }

    /// Story: an unset timeout serializes as the empty string so the
    /// document never invents a value the user did not write.
    #[test]
    fn story_zero_means_unset() {
        let d = HumanDuration::default();
        assert!(d.is_zero());
        assert_eq!(serde_yaml::to_string(&d).unwrap().trim(), "''");

        let back: HumanDuration = serde_yaml::from_str("\"\"").unwrap();
        assert!(back.is_zero());

        assert_eq!(
            d.or_default(HumanDuration::from_secs(30)),
            HumanDuration::from_secs(30)
        );
    }

    #[test]
    fn story_compound_durations_parse() {
        let d: HumanDuration = "2h 15m".parse().unwrap();
        assert_eq!(d.as_duration(), Duration::from_secs(2 * 3600 + 15 * 60));
    }
}
