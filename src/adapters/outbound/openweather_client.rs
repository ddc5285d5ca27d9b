//! OpenWeather Client
//!
//! Implements WeatherProvider against the OpenWeatherMap "current weather"
//! endpoint and maps its payload into `WeatherRecord`.

use crate::config::ApiKey;
use crate::domain::entities::WeatherRecord;
use crate::domain::ports::{FetchError, WeatherProvider};
use crate::domain::value_objects::CityCode;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Raw provider payload. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    name: String,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    wind: WindBlock,
    /// Meters
    #[serde(default)]
    visibility: i64,
    sys: SysBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: i64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: String,
    description: String,
    #[serde(default)]
    #[allow(dead_code)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
    #[serde(default)]
    deg: i64,
}

#[derive(Debug, Deserialize)]
struct SysBlock {
    sunrise: i64,
    sunset: i64,
}

impl ProviderResponse {
    /// Map into the public record. The first condition entry is authoritative.
    fn into_record(self, code: &CityCode) -> Result<WeatherRecord, FetchError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or(FetchError::MissingConditionData)?;

        Ok(WeatherRecord {
            city_name: self.name,
            city_code: code.clone(),
            temperature: self.main.temp,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            description: condition.description,
            condition: condition.main,
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            visibility: self.visibility as f64 / 1000.0,
            wind_speed: self.wind.speed,
            wind_degree: self.wind.deg,
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
        })
    }
}

/// OpenWeatherMap client.
///
/// Every call is a single GET with metric units; there is no retry.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl OpenWeatherClient {
    /// Create a client for `base_url` (the full current-weather endpoint URL).
    pub fn new(base_url: String, api_key: ApiKey, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Parse a provider body into a record for `code`.
    fn map_body(body: &str, code: &CityCode) -> Result<WeatherRecord, FetchError> {
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        let parsed: ProviderResponse = serde_json::from_str(body).map_err(FetchError::Parse)?;
        parsed.into_record(code)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_weather(&self, code: &CityCode) -> Result<WeatherRecord, FetchError> {
        // reqwest errors carry the request URL, which includes the API key
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("id", code.as_str()),
                ("appid", self.api_key.expose()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url()))?;

        let record = Self::map_body(&body, code)?;
        tracing::debug!("fetched weather for city {} ({})", code, record.city_name);
        Ok(record)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "owm-test-key-5f1c";

    fn colombo_payload() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lon": 79.8478, "lat": 6.9319},
            "weather": [
                {"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"},
                {"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}
            ],
            "base": "stations",
            "main": {
                "temp": 30.97, "feels_like": 37.97, "temp_min": 30.97, "temp_max": 30.97,
                "pressure": 1009, "humidity": 70, "sea_level": 1009, "grnd_level": 1008
            },
            "visibility": 8500,
            "wind": {"speed": 4.63, "deg": 250, "gust": 6.1},
            "clouds": {"all": 75},
            "dt": 1700000000,
            "sys": {"type": 1, "id": 9098, "country": "LK", "sunrise": 1699922000, "sunset": 1699964800},
            "timezone": 19800,
            "id": 1248991,
            "name": "Colombo",
            "cod": 200
        })
    }

    fn code(raw: &str) -> CityCode {
        CityCode::new(raw).unwrap()
    }

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(
            format!("{}/data/2.5/weather", server.uri()),
            ApiKey::new(API_KEY),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_maps_provider_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("id", "1248991"))
            .and(query_param("appid", API_KEY))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(colombo_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let record = client_for(&server).fetch_weather(&code("1248991")).await.unwrap();

        assert_eq!(record.city_name, "Colombo");
        assert_eq!(record.city_code, code("1248991"));
        assert_eq!(record.temperature, 30.97);
        assert_eq!(record.condition, "Clouds");
        assert_eq!(record.description, "broken clouds");
        assert_eq!(record.humidity, 70);
        assert_eq!(record.pressure, 1009);
        assert_eq!(record.visibility, 8.5);
        assert_eq!(record.wind_speed, 4.63);
        assert_eq!(record.wind_degree, 250);
        assert_eq!(record.sunrise, 1699922000);
        assert_eq!(record.sunset, 1699964800);
    }

    #[test]
    fn test_visibility_is_meters_over_thousand() {
        for meters in [0_i64, 1, 999, 1000, 8500, 10000, 12345] {
            let mut payload = colombo_payload();
            payload["visibility"] = serde_json::json!(meters);
            let record =
                OpenWeatherClient::map_body(&payload.to_string(), &code("1248991")).unwrap();
            assert_eq!(record.visibility, meters as f64 / 1000.0);
        }
    }

    #[test]
    fn test_missing_visibility_defaults_to_zero() {
        let mut payload = colombo_payload();
        payload.as_object_mut().unwrap().remove("visibility");
        let record = OpenWeatherClient::map_body(&payload.to_string(), &code("1248991")).unwrap();
        assert_eq!(record.visibility, 0.0);
    }

    #[test]
    fn test_empty_condition_array_is_rejected() {
        let mut payload = colombo_payload();
        payload["weather"] = serde_json::json!([]);
        let result = OpenWeatherClient::map_body(&payload.to_string(), &code("1248991"));
        assert!(matches!(result, Err(FetchError::MissingConditionData)));
    }

    #[test]
    fn test_absent_condition_array_is_rejected() {
        let mut payload = colombo_payload();
        payload.as_object_mut().unwrap().remove("weather");
        let result = OpenWeatherClient::map_body(&payload.to_string(), &code("1248991"));
        assert!(matches!(result, Err(FetchError::MissingConditionData)));
    }

    #[test]
    fn test_missing_main_block_is_parse_error() {
        let mut payload = colombo_payload();
        payload.as_object_mut().unwrap().remove("main");
        let result = OpenWeatherClient::map_body(&payload.to_string(), &code("1248991"));
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_weather(&code("1")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 500));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_unknown_city_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_weather(&code("999999999")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_weather(&code("1")).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody));
    }

    #[tokio::test]
    async fn test_fetch_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_weather(&code("1")).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenWeatherClient::new(
            format!("http://{}/data/2.5/weather", addr),
            ApiKey::new(API_KEY),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.fetch_weather(&code("1")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(!err.to_string().contains(API_KEY));
        assert!(!format!("{:?}", err).contains(API_KEY));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(colombo_payload())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(
            format!("{}/data/2.5/weather", server.uri()),
            ApiKey::new(API_KEY),
            Duration::from_millis(100),
        )
        .unwrap();

        let err = client.fetch_weather(&code("1")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
