//! Weather Provider Port
//!
//! Defines the interface for fetching current weather for one city.

use crate::domain::entities::WeatherRecord;
use crate::domain::value_objects::CityCode;
use async_trait::async_trait;
use reqwest::StatusCode;

/// Failure to obtain a weather record for a city.
///
/// Display output never contains the request URL (and so never the
/// provider API key).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("weather provider unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("weather provider returned status {0}")]
    Status(StatusCode),
    #[error("weather provider returned an empty body")]
    EmptyBody,
    #[error("weather provider response could not be parsed: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("weather provider response has no weather condition entry")]
    MissingConditionData,
}

impl FetchError {
    /// Whether the provider reported the city itself as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status(status) if *status == StatusCode::NOT_FOUND)
    }
}

/// Upstream weather provider.
///
/// One call is one upstream request: implementations do not cache and
/// do not retry.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch and map the current weather for `code`.
    async fn fetch_weather(&self, code: &CityCode) -> Result<WeatherRecord, FetchError>;
}
