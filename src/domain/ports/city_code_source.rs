//! City Code Source Port
//!
//! Defines the interface for reading the static list of cities to relay.

use crate::domain::value_objects::CityCode;
use std::path::PathBuf;

/// Failure to read the city dataset.
///
/// Always fatal to the request that needed the dataset, never to the process.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("failed to read city dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("city dataset is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("city dataset has no `List` field")]
    MissingList,
}

/// Source of the city codes the relay serves.
///
/// This is an outbound port over a packaged static asset, so it is
/// synchronous and never retried.
pub trait CityCodeSource: Send + Sync {
    /// Load all city codes in dataset order.
    ///
    /// An empty dataset yields an empty vector, not an error.
    fn load_city_codes(&self) -> Result<Vec<CityCode>, DataLoadError>;
}
