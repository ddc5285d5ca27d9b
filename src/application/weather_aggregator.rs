//! Weather Aggregator - Main application use case
//!
//! Combines the city dataset, the cache and the weather provider into the
//! two reads the API offers: every configured city, or a single city.

use crate::domain::entities::WeatherRecord;
use crate::domain::ports::{CityCodeSource, DataLoadError, FetchError, WeatherProvider};
use crate::domain::value_objects::CityCode;
use crate::infrastructure::WeatherCache;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Outcome of a single-city lookup.
#[derive(Debug)]
pub enum CityLookup {
    Found(WeatherRecord),
    /// The provider does not know this city code
    NotFound,
    /// The city may exist but its weather could not be fetched
    Unavailable(FetchError),
}

/// Weather aggregator - main application use case.
///
/// 1. Loads the city codes to serve
/// 2. Resolves each city through the cache, falling back to the provider
/// 3. Drops cities whose fetch failed instead of failing the batch
pub struct WeatherAggregator {
    cities: Arc<dyn CityCodeSource>,
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<WeatherCache>,
    fetch_concurrency: usize,
}

impl WeatherAggregator {
    /// Create a new aggregator.
    ///
    /// `fetch_concurrency` bounds how many provider lookups run at once
    /// when resolving the full list; values below 1 are treated as 1.
    pub fn new(
        cities: Arc<dyn CityCodeSource>,
        provider: Arc<dyn WeatherProvider>,
        cache: Arc<WeatherCache>,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            cities,
            provider,
            cache,
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<WeatherCache> {
        &self.cache
    }

    /// Current weather for every city in the dataset.
    ///
    /// Fails only when the dataset cannot be read. Results keep dataset
    /// order; cities whose fetch failed are logged and left out.
    pub async fn get_all_weather(&self) -> Result<Vec<WeatherRecord>, DataLoadError> {
        let codes = self.cities.load_city_codes().map_err(|e| {
            tracing::error!("failed to load city codes: {}", e);
            e
        })?;
        tracing::info!("loaded {} city codes", codes.len());

        let total = codes.len();
        let results: Vec<(CityCode, Result<WeatherRecord, FetchError>)> = stream::iter(codes)
            .map(|code| async move {
                let result = self.cached_weather(&code).await;
                (code, result)
            })
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let records: Vec<WeatherRecord> = results
            .into_iter()
            .filter_map(|(code, result)| match result {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("skipping city {}: {}", code, e);
                    None
                }
            })
            .collect();

        tracing::info!(
            "resolved weather for {} of {} cities",
            records.len(),
            total
        );
        Ok(records)
    }

    /// Current weather for one city, through the same cache as the full list.
    pub async fn get_weather_by_city_code(&self, code: &CityCode) -> CityLookup {
        match self.cached_weather(code).await {
            Ok(record) => CityLookup::Found(record),
            Err(e) if e.is_not_found() => {
                tracing::info!("city {} is unknown to the provider", code);
                CityLookup::NotFound
            }
            Err(e) => {
                tracing::warn!("weather for city {} unavailable: {}", code, e);
                CityLookup::Unavailable(e)
            }
        }
    }

    async fn cached_weather(&self, code: &CityCode) -> Result<WeatherRecord, FetchError> {
        self.cache
            .get(code, || self.provider.fetch_weather(code))
            .await
    }
}
