//! weather-relay Library
//!
//! This module exposes the weather-relay components for use in integration
//! tests and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use adapters::inbound::{ApiServer, ApiState};
pub use application::{AuthGateway, CityLookup, WeatherAggregator};
pub use config::{load_config, ApiKey, Config};
pub use domain::entities::{CityEntry, WeatherRecord};
pub use domain::ports::{CityCodeSource, SigningKeySource, WeatherProvider};
pub use domain::value_objects::CityCode;
pub use infrastructure::{CachePolicy, ShutdownController, WeatherCache};
