//! JSON City Code Loader
//!
//! Implements CityCodeSource over the `{"List": [{"CityCode": ..}, ..]}`
//! dataset, either compiled into the binary or read from a file.

use crate::domain::entities::CityEntry;
use crate::domain::ports::{CityCodeSource, DataLoadError};
use crate::domain::value_objects::CityCode;
use serde_json::Value;
use std::path::PathBuf;

/// Embedded city dataset (compiled into binary).
const EMBEDDED_CITIES: &str = include_str!("../../../data/cities.json");

#[derive(Debug, Clone)]
enum DatasetLocation {
    Embedded(&'static str),
    File(PathBuf),
}

/// City dataset loader.
///
/// A file-backed loader re-reads its file on every call, so a replaced
/// dataset is picked up without a restart.
#[derive(Debug, Clone)]
pub struct JsonCityCodeLoader {
    location: DatasetLocation,
}

impl JsonCityCodeLoader {
    /// Use the dataset embedded in the binary.
    pub fn embedded() -> Self {
        Self {
            location: DatasetLocation::Embedded(EMBEDDED_CITIES),
        }
    }

    /// Read the dataset from `path` on each load.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DatasetLocation::File(path.into()),
        }
    }

    /// Parse a dataset document into its entries.
    pub fn parse_entries(raw: &str) -> Result<Vec<CityEntry>, DataLoadError> {
        let root: Value = serde_json::from_str(raw).map_err(DataLoadError::Malformed)?;

        let list = match root {
            Value::Object(mut fields) => fields.remove("List"),
            _ => None,
        };

        match list {
            None | Some(Value::Null) => Err(DataLoadError::MissingList),
            Some(list) => serde_json::from_value(list).map_err(DataLoadError::Malformed),
        }
    }

    fn read(&self) -> Result<String, DataLoadError> {
        match &self.location {
            DatasetLocation::Embedded(raw) => Ok((*raw).to_string()),
            DatasetLocation::File(path) => {
                std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

impl CityCodeSource for JsonCityCodeLoader {
    fn load_city_codes(&self) -> Result<Vec<CityCode>, DataLoadError> {
        let raw = self.read()?;
        let entries = Self::parse_entries(&raw)?;
        Ok(entries.into_iter().map(|entry| entry.city_code).collect())
    }
}
