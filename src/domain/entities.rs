//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the weather relay.
//! They have no external dependencies and contain only business logic.

use crate::domain::value_objects::CityCode;
use serde::{Deserialize, Serialize};

/// Current weather for one city, as served to API clients.
///
/// Built fresh from each provider response and never mutated afterwards.
/// Serialized with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    pub city_name: String,
    pub city_code: CityCode,
    /// Current temperature (°C)
    pub temperature: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Free-text description, e.g. "broken clouds"
    pub description: String,
    /// Condition category, e.g. "Clouds"
    pub condition: String,
    /// Relative humidity (%)
    pub humidity: i64,
    /// Atmospheric pressure (hPa)
    pub pressure: i64,
    /// Visibility (km)
    pub visibility: f64,
    /// Wind speed (m/s)
    pub wind_speed: f64,
    /// Wind direction (degrees)
    pub wind_degree: i64,
    /// Sunrise (unix seconds, UTC)
    pub sunrise: i64,
    /// Sunset (unix seconds, UTC)
    pub sunset: i64,
}

/// One row of the bundled city dataset.
///
/// Only `city_code` drives the relay; the other columns are carried for
/// completeness and may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct CityEntry {
    #[serde(rename = "CityCode")]
    pub city_code: CityCode,
    #[serde(rename = "CityName", default)]
    pub city_name: Option<String>,
    #[serde(rename = "Temp", default)]
    pub temp: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}
