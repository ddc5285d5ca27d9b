//! Application Layer
//!
//! Use cases orchestrating the domain through its ports.

pub mod auth_gateway;
pub mod weather_aggregator;

pub use auth_gateway::{Audience, AudienceValidator, AuthGateway, Claims, ClaimsValidator};
pub use weather_aggregator::{CityLookup, WeatherAggregator};
