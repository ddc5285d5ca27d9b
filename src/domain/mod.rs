//! Domain Layer
//!
//! Entities, value objects and the ports the application talks through.

pub mod entities;
pub mod ports;
pub mod value_objects;

pub use entities::{CityEntry, WeatherRecord};
pub use value_objects::CityCode;
