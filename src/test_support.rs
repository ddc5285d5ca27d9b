//! Shared fixtures for unit tests.

use crate::domain::entities::WeatherRecord;
use crate::domain::ports::{
    AuthError, CityCodeSource, DataLoadError, FetchError, SigningKeySource, WeatherProvider,
};
use crate::domain::value_objects::CityCode;
use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const TEST_ISSUER: &str = "https://issuer.weather-relay.test/";
pub const TEST_AUDIENCE: &str = "https://weather-api.test";
pub const TEST_SECRET: &[u8] = b"weather-relay-test-secret-0123456789abcd!!";

pub fn sample_record(code: &str, name: &str) -> WeatherRecord {
    WeatherRecord {
        city_name: name.to_string(),
        city_code: CityCode::new(code).expect("test city code"),
        temperature: 21.5,
        temp_min: 19.0,
        temp_max: 23.0,
        description: "scattered clouds".to_string(),
        condition: "Clouds".to_string(),
        humidity: 60,
        pressure: 1013,
        visibility: 10.0,
        wind_speed: 3.1,
        wind_degree: 180,
        sunrise: 1_700_000_000,
        sunset: 1_700_040_000,
    }
}

/// Claims for a token that passes every check.
pub fn valid_claims() -> serde_json::Value {
    let now = jsonwebtoken::get_current_timestamp();
    serde_json::json!({
        "iss": TEST_ISSUER,
        "sub": "auth0|tester",
        "aud": [TEST_AUDIENCE, "https://issuer.weather-relay.test/userinfo"],
        "iat": now,
        "exp": now + 3600,
    })
}

/// HS256 token over `claims` signed with the test secret.
pub fn mint_token(claims: &serde_json::Value) -> String {
    let mut header = Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some("test-key".to_string());
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(TEST_SECRET))
        .expect("mint test token")
}

/// Key source that always hands out the test secret.
pub struct FixedKeySource;

#[async_trait]
impl SigningKeySource for FixedKeySource {
    async fn decoding_key(&self, _kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        Ok(DecodingKey::from_secret(TEST_SECRET))
    }
}

/// City source returning a fixed list, or failing on demand.
pub struct FakeCitySource {
    codes: Mutex<Option<Vec<String>>>,
}

impl FakeCitySource {
    pub fn with_codes(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(Some(codes.iter().map(|c| c.to_string()).collect())),
        }
    }

    pub fn failing() -> Self {
        Self {
            codes: Mutex::new(None),
        }
    }
}

impl CityCodeSource for FakeCitySource {
    fn load_city_codes(&self) -> Result<Vec<CityCode>, DataLoadError> {
        match &*self.codes.lock() {
            Some(codes) => Ok(codes.iter().filter_map(CityCode::new).collect()),
            None => Err(DataLoadError::MissingList),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Weather(WeatherRecord),
    Status(u16),
    MissingCondition,
}

/// Provider with scripted per-city outcomes and a call counter.
///
/// Cities without a script answer 404.
pub struct FakeProvider {
    outcomes: DashMap<String, (FakeOutcome, Duration)>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            outcomes: DashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_city(self, code: &str, name: &str) -> Self {
        self.with_outcome(code, FakeOutcome::Weather(sample_record(code, name)))
    }

    pub fn with_outcome(self, code: &str, outcome: FakeOutcome) -> Self {
        self.outcomes
            .insert(code.to_string(), (outcome, Duration::ZERO));
        self
    }

    pub fn with_delay(self, code: &str, delay: Duration) -> Self {
        if let Some(mut entry) = self.outcomes.get_mut(code) {
            entry.1 = delay;
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn fetch_weather(&self, code: &CityCode) -> Result<WeatherRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.outcomes.get(code.as_str()).map(|e| e.value().clone());

        let Some((outcome, delay)) = scripted else {
            return Err(FetchError::Status(StatusCode::NOT_FOUND));
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            FakeOutcome::Weather(record) => Ok(record),
            FakeOutcome::Status(status) => Err(FetchError::Status(
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            )),
            FakeOutcome::MissingCondition => Err(FetchError::MissingConditionData),
        }
    }
}
