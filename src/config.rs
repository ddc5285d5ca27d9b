use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// OpenWeatherMap API key.
///
/// `Debug` and `Display` are redacted; use [`ApiKey::expose`] where the raw
/// value must go on the wire.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // HTTP server settings
    pub listen_addr: String,
    pub cors_allowed_origin: String,
    pub debug: bool,

    // Token validation settings
    pub issuer_uri: String,
    pub audience: String,
    pub jwks_uri: Option<String>,

    // Weather provider settings
    pub openweather_api_key: ApiKey,
    pub openweather_api_url: String,
    pub http_timeout_secs: u64,
    pub fetch_concurrency: usize,

    // City dataset
    pub cities_path: Option<String>,

    // Cache settings
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub cache_gc_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            cors_allowed_origin: "http://localhost:3000".to_string(),
            debug: false,
            issuer_uri: String::new(),
            audience: String::new(),
            jwks_uri: None,
            openweather_api_key: ApiKey::default(),
            openweather_api_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            http_timeout_secs: 10,
            fetch_concurrency: 8,
            cities_path: None,
            cache_ttl_secs: 300,
            cache_max_entries: 1024,
            cache_gc_interval_secs: 60,
        }
    }
}

impl Config {
    /// Build a config from a variable lookup such as `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| {
            lookup(&format!("WEATHER_RELAY_{}", name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| {
            var(name).with_context(|| format!("WEATHER_RELAY_{} must be set", name))
        };

        let listen_addr = var("LISTEN_ADDR").unwrap_or(defaults.listen_addr);

        let cors_allowed_origin =
            var("CORS_ALLOWED_ORIGIN").unwrap_or(defaults.cors_allowed_origin);

        let debug = lookup("DEBUG").is_some();

        // Token validation settings
        let issuer_uri = required("ISSUER_URI")?;
        let audience = required("AUDIENCE")?;
        let jwks_uri = var("JWKS_URI");

        // Weather provider settings
        let openweather_api_key = ApiKey::new(required("OPENWEATHER_API_KEY")?);

        let openweather_api_url =
            var("OPENWEATHER_API_URL").unwrap_or(defaults.openweather_api_url);

        let http_timeout_secs = var("HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.http_timeout_secs);

        let fetch_concurrency = var("FETCH_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.fetch_concurrency);

        let cities_path = var("CITIES_PATH");

        // Cache settings
        let cache_ttl_secs = var("CACHE_TTL_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cache_ttl_secs);

        let cache_max_entries = var("CACHE_MAX_ENTRIES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cache_max_entries);

        let cache_gc_interval_secs = var("CACHE_GC_INTERVAL_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cache_gc_interval_secs);

        Ok(Config {
            listen_addr,
            cors_allowed_origin,
            debug,
            issuer_uri,
            audience,
            jwks_uri,
            openweather_api_key,
            openweather_api_url,
            http_timeout_secs,
            fetch_concurrency,
            cities_path,
            cache_ttl_secs,
            cache_max_entries,
            cache_gc_interval_secs,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_gc_interval(&self) -> Duration {
        Duration::from_secs(self.cache_gc_interval_secs.max(1))
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    Config::from_lookup(|name| std::env::var(name).ok())
}
