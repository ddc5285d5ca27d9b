mod city_code_source;
mod signing_key_source;
mod weather_provider;

pub use city_code_source::{CityCodeSource, DataLoadError};
pub use signing_key_source::{AuthError, AuthStage, SigningKeySource};
pub use weather_provider::{FetchError, WeatherProvider};
