//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Provider-specific identifier for a city.
///
/// Opaque to this service: the only guarantees are that it is trimmed
/// and non-empty. Codes are passed to the weather provider verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CityCode(String);

impl CityCode {
    /// Build a city code, returning `None` for blank input.
    ///
    /// # Examples
    /// ```
    /// use weather_relay::domain::value_objects::CityCode;
    ///
    /// assert_eq!(CityCode::new(" 1248991 ").unwrap().as_str(), "1248991");
    /// assert!(CityCode::new("   ").is_none());
    /// ```
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let trimmed = code.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CityCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CityCode::new(&raw).ok_or_else(|| serde::de::Error::custom("city code must not be blank"))
    }
}
