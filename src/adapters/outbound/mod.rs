mod json_city_code_loader;
mod jwks_key_source;
mod openweather_client;

pub use json_city_code_loader::JsonCityCodeLoader;
pub use jwks_key_source::JwksKeySource;
pub use openweather_client::OpenWeatherClient;
