//! weather-relay - Authenticated weather API with Hexagonal Architecture
//!
//! This is the composition root that wires together all the components.

use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use weather_relay::adapters::inbound::{ApiServer, ApiState};
use weather_relay::adapters::outbound::{JsonCityCodeLoader, JwksKeySource, OpenWeatherClient};
use weather_relay::application::{AuthGateway, WeatherAggregator};
use weather_relay::config::load_config;
use weather_relay::domain::ports::CityCodeSource;
use weather_relay::infrastructure::{shutdown_signal, CachePolicy, ShutdownController, WeatherCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting weather-relay listen={} issuer={} origin={}",
        cfg.listen_addr,
        cfg.issuer_uri,
        cfg.cors_allowed_origin
    );

    // ===== COMPOSITION ROOT =====
    // Wire up all adapters and services

    // 1. Create outbound adapters

    // City dataset (embedded unless a file is configured)
    let cities: Arc<dyn CityCodeSource> = match &cfg.cities_path {
        Some(path) => {
            tracing::info!("city dataset: file {}", path);
            Arc::new(JsonCityCodeLoader::from_file(path))
        }
        None => {
            tracing::info!("city dataset: embedded");
            Arc::new(JsonCityCodeLoader::embedded())
        }
    };

    // Weather provider (OpenWeatherMap)
    let provider = Arc::new(OpenWeatherClient::new(
        cfg.openweather_api_url.clone(),
        cfg.openweather_api_key.clone(),
        cfg.http_timeout(),
    )?);

    // Signing keys (issuer JWKS)
    let keys = Arc::new(JwksKeySource::new(
        cfg.issuer_uri.clone(),
        cfg.jwks_uri.clone(),
        cfg.http_timeout(),
    )?);

    // Weather cache (DashMap)
    let cache = Arc::new(WeatherCache::with_system_clock(CachePolicy {
        ttl: cfg.cache_ttl(),
        max_entries: cfg.cache_max_entries,
    }));
    cache.start_gc(cfg.cache_gc_interval());

    // 2. Create application services
    let aggregator = Arc::new(WeatherAggregator::new(
        cities,
        provider,
        cache,
        cfg.fetch_concurrency,
    ));
    let gateway = Arc::new(AuthGateway::for_audience(
        cfg.issuer_uri.clone(),
        cfg.audience.clone(),
        keys,
    ));

    // 3. Create inbound adapter and run
    let server = ApiServer::new(
        cfg.listen_addr.clone(),
        ApiState::new(aggregator, gateway),
        &cfg.cors_allowed_origin,
    )?;

    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    server.run(shutdown).await
}
