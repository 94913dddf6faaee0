use std::fmt;
use std::fs;
use std::path::Path;

use foundation::{GeoPoint, NamedLocation};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of the city list document (`cities.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CityRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Validated city list.
///
/// Records that cannot be placed on the globe are dropped at load time and
/// counted in `rejected`; everything else keeps document order, duplicates
/// included.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CityList {
    pub cities: Vec<CityRecord>,
    pub rejected: usize,
}

#[derive(Debug)]
pub enum CityListError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for CityListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CityListError::Io(err) => write!(f, "I/O error: {err}"),
            CityListError::Parse(err) => write!(f, "City list parse error: {err}"),
        }
    }
}

impl std::error::Error for CityListError {}

impl CityList {
    pub fn from_records(records: Vec<CityRecord>) -> Self {
        let mut cities = Vec::with_capacity(records.len());
        let mut rejected = 0;

        for record in records {
            if record.name.trim().is_empty() {
                warn!("dropping city record with blank name");
                rejected += 1;
                continue;
            }
            if let Err(err) = GeoPoint::try_new(record.latitude, record.longitude) {
                warn!("dropping city {:?}: {err}", record.name);
                rejected += 1;
                continue;
            }
            cities.push(record);
        }

        Self { cities, rejected }
    }

    pub fn from_json_str(payload: &str) -> Result<Self, CityListError> {
        let records: Vec<CityRecord> =
            serde_json::from_str(payload).map_err(CityListError::Parse)?;
        Ok(Self::from_records(records))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CityListError> {
        let payload = fs::read_to_string(path).map_err(CityListError::Io)?;
        Self::from_json_str(&payload)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn into_locations(self) -> Vec<NamedLocation> {
        self.cities
            .into_iter()
            .map(|c| NamedLocation::new(c.name, GeoPoint::new(c.latitude, c.longitude)))
            .collect()
    }
}
